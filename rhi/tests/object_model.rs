mod common;

use common::{new_interface, CountingAllocator, MockDescriptorSetLayout};
use rhi::{
    CastError, Derived, DescriptorSetLayout, DescriptorSetLayoutCreateInfo, Interface, Kind,
    Object, PipelineLayout, Ptr, Surface,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

fn empty_layout(interface: &Ptr<Interface>) -> Ptr<DescriptorSetLayout> {
    interface
        .new_descriptor_set_layout(&DescriptorSetLayoutCreateInfo::default())
        .unwrap()
}

#[test]
fn clones_and_drops_balance_out() {
    let allocator = CountingAllocator::unlimited();
    let (interface, counters) = new_interface(allocator).unwrap();
    assert_eq!(Ptr::ref_count(&interface), 1);

    let clones: Vec<_> = (0..16).map(|_| interface.clone()).collect();
    assert_eq!(Ptr::ref_count(&interface), 17);
    drop(clones);
    assert_eq!(Ptr::ref_count(&interface), 1);
    assert_eq!(counters.deleted("interface"), 0);

    drop(interface);
    assert_eq!(counters.deleted("interface"), 1);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn move_does_not_touch_the_count() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let moved = interface;
    assert_eq!(Ptr::ref_count(&moved), 1);

    let mut slot: Option<Ptr<Interface>> = None;
    slot.replace(moved);
    assert_eq!(Ptr::ref_count(slot.as_ref().unwrap()), 1);
}

#[test]
fn assigning_over_a_handle_releases_the_old_object() {
    let allocator = CountingAllocator::unlimited();
    let (first, first_counters) = new_interface(allocator).unwrap();
    let (second, second_counters) = new_interface(allocator).unwrap();

    let mut handle = first;
    assert_eq!(first_counters.deleted("interface"), 0);
    assert_eq!(Ptr::ref_count(&handle), 1);
    handle = second.clone();
    assert_eq!(first_counters.deleted("interface"), 1);
    assert_eq!(second_counters.deleted("interface"), 0);
    assert_eq!(Ptr::ref_count(&second), 2);
    assert!(Ptr::ptr_eq(&handle, &second));
}

#[test]
fn raw_round_trip_keeps_the_reference() {
    let (interface, counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let raw = Ptr::into_raw(interface);
    assert_eq!(counters.deleted("interface"), 0);

    let adopted = unsafe { Ptr::from_raw(raw) };
    let shared = unsafe { Ptr::from_raw_acquire(raw) };
    assert_eq!(Ptr::ref_count(&adopted), 2);
    drop(adopted);
    drop(shared);
    assert_eq!(counters.deleted("interface"), 1);
}

#[test]
fn resources_keep_their_interface_alive() {
    let allocator = CountingAllocator::unlimited();
    let (interface, counters) = new_interface(allocator).unwrap();
    let layout = empty_layout(&interface);
    assert_eq!(Ptr::ref_count(&interface), 2);

    let parent = layout.object().parent().unwrap();
    assert!(Ptr::ptr_eq(parent, &interface));

    drop(interface);
    assert_eq!(counters.deleted("interface"), 0);

    drop(layout);
    assert_eq!(
        counters.events(),
        ["descriptor_set_layout", "interface"],
        "the payload is torn down before its parent is released"
    );
    assert_eq!(allocator.live(), 0);
}

#[test]
fn upcast_keeps_the_identity() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let layout = empty_layout(&interface);
    let address = Ptr::as_ptr(&layout).cast::<u8>();

    let object: Ptr<Object> = layout.clone().upcast();
    assert_eq!(Ptr::as_ptr(&object).cast::<u8>(), address);
    assert!(Ptr::ptr_eq(&object, &layout));
    assert_eq!(Ptr::ref_count(&layout), 2);

    let by_ref: &Object = rhi::upcast(&*layout);
    assert!(std::ptr::eq(by_ref, layout.object()));
}

#[test]
fn upcasting_twice_is_the_same_as_once() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let layout = empty_layout(&interface);
    let concrete: Ptr<MockDescriptorSetLayout> = layout.clone().downcast().unwrap();

    let once: Ptr<DescriptorSetLayout> = concrete.clone().upcast();
    let twice: Ptr<DescriptorSetLayout> = once.clone().upcast();
    assert!(Ptr::ptr_eq(&once, &twice));
    assert!(Ptr::ptr_eq(&twice, &layout));

    let object: Ptr<Object> = twice.upcast();
    let object_again: Ptr<Object> = object.clone().upcast();
    assert!(Ptr::ptr_eq(&object, &object_again));
}

#[test]
fn base_is_the_embedded_record() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let layout = empty_layout(&interface);
    assert!(std::ptr::eq(Derived::base(&*layout), layout.object()));

    let concrete = layout.downcast_ref::<MockDescriptorSetLayout>().unwrap();
    let base: &DescriptorSetLayout = Derived::base(concrete);
    assert!(std::ptr::eq(base, &*layout));
    assert!(std::ptr::eq(Derived::base(base), concrete.object()));
}

#[test]
fn free_cast_functions_round_trip() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let layout = empty_layout(&interface);

    let object = rhi::upcast_ptr::<Object, _>(layout.clone());
    assert!(Ptr::ptr_eq(&object, &layout));
    let back = rhi::downcast::<DescriptorSetLayout, _>(object).unwrap();
    assert!(Ptr::ptr_eq(&back, &layout));
    assert_eq!(Ptr::ref_count(&layout), 2);

    let object = rhi::upcast_ptr::<Object, _>(back);
    let error = rhi::downcast::<PipelineLayout, _>(object).unwrap_err();
    assert!(error.found.ends_with("MockDescriptorSetLayout"));
    assert_eq!(Ptr::ref_count(&layout), 1);
}

#[test]
fn downcast_inverts_upcast() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let layout = empty_layout(&interface);

    let object: Ptr<Object> = layout.clone().upcast();
    let back: Ptr<DescriptorSetLayout> = object.downcast().unwrap();
    assert!(Ptr::ptr_eq(&back, &layout));

    let concrete = back.downcast_ref::<MockDescriptorSetLayout>();
    assert!(concrete.is_ok());
    assert_eq!(Ptr::ref_count(&layout), 2);
}

#[test]
fn downcast_to_an_unrelated_kind_fails() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let layout = empty_layout(&interface);

    let object: Ptr<Object> = layout.clone().upcast();
    let error: CastError = object.downcast::<PipelineLayout>().unwrap_err();
    assert!(error.expected.ends_with("PipelineLayout"));
    assert!(error.found.ends_with("MockDescriptorSetLayout"));

    // 失敗したdowncastはハンドルを破棄する
    assert_eq!(Ptr::ref_count(&layout), 1);
}

#[test]
fn runtime_kind_is_the_most_derived_one() {
    let (interface, _counters) = new_interface(CountingAllocator::unlimited()).unwrap();
    let layout = empty_layout(&interface);

    let kind = layout.object().kind();
    assert!(std::ptr::eq(kind, MockDescriptorSetLayout::info()));
    assert!(kind.is(DescriptorSetLayout::info()));
    assert!(kind.is(Object::info()));
}

#[test]
fn concurrent_clones_run_one_deleter() {
    let allocator = CountingAllocator::unlimited();
    let (interface, counters) = new_interface(allocator).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let interface = interface.clone();
            scope.spawn(move || {
                for _ in 0..1000 {
                    let clone = interface.clone();
                    let layout = empty_layout(&clone);
                    drop(clone);
                    drop(layout);
                }
            });
        }
    });

    assert_eq!(Ptr::ref_count(&interface), 1);
    assert_eq!(counters.deleted("descriptor_set_layout"), 8000);
    drop(interface);
    assert_eq!(counters.deleted("interface"), 1);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn header_of_another_kind_is_rejected() {
    let allocator = CountingAllocator::unlimited();
    let result = catch_unwind(AssertUnwindSafe(|| {
        rhi::new_object::<Surface, _>(None, allocator, |outer| {
            let mut spare = None;
            let _ = rhi::new_object::<DescriptorSetLayout, _>(None, allocator, |inner| {
                spare = Some(inner);
                DescriptorSetLayout::new(outer, &DescriptorSetLayoutCreateInfo::default())
            });
            Surface::new(spare.unwrap())
        })
    }));
    assert!(result.is_err());
    // どちらのストレージも解放されている
    assert_eq!(allocator.allocations(), 2);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn header_from_another_allocator_is_rejected() {
    let outer_allocator = CountingAllocator::unlimited();
    let inner_allocator = CountingAllocator::unlimited();
    let create_info = DescriptorSetLayoutCreateInfo::default();
    let result = catch_unwind(AssertUnwindSafe(|| {
        rhi::new_object::<DescriptorSetLayout, _>(None, outer_allocator, |outer| {
            let mut spare = None;
            let _ = rhi::new_object::<DescriptorSetLayout, _>(None, inner_allocator, |inner| {
                spare = Some(inner);
                DescriptorSetLayout::new(outer, &create_info)
            });
            DescriptorSetLayout::new(spare.unwrap(), &create_info)
        })
    }));
    assert!(result.is_err());
    assert_eq!(outer_allocator.live(), 0);
    assert_eq!(inner_allocator.live(), 0);
}
