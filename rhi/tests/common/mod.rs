//! 破棄の回数と順番を記録するだけのバックエンド。
//!
//! DescriptorSetLayoutとPipelineLayoutだけを実装し、それ以外はUnsupportedのまま。

#![allow(dead_code)]

use rhi::{
    Allocator, DescriptorSetLayout, DescriptorSetLayoutCreateInfo, Interface, InterfaceDispatch,
    Kind, Object, PipelineLayout, PipelineLayoutCreateInfo, Ptr, Result,
};
use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// 破棄されたリソースの記録
#[derive(Debug, Default)]
pub struct Counters {
    events: Mutex<Vec<&'static str>>,
}
impl Counters {
    pub fn deleted(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| **event == name)
            .count()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

/// Dropされたときに名前を記録する
struct DropRecorder {
    counters: Arc<Counters>,
    name: &'static str,
}
impl Drop for DropRecorder {
    fn drop(&mut self) {
        self.counters.events.lock().unwrap().push(self.name);
    }
}

#[repr(C)]
pub struct MockInterface {
    base: Interface,
    counters: Arc<Counters>,
    _recorder: DropRecorder,
}
rhi::impl_kind!(MockInterface { base: Interface } => Object);

#[repr(C)]
pub struct MockDescriptorSetLayout {
    base: DescriptorSetLayout,
    _recorder: DropRecorder,
}
rhi::impl_kind!(MockDescriptorSetLayout { base: DescriptorSetLayout } => Object);

#[repr(C)]
pub struct MockPipelineLayout {
    base: PipelineLayout,
    _recorder: DropRecorder,
}
rhi::impl_kind!(MockPipelineLayout { base: PipelineLayout } => Object);

struct MockDispatch;

static MOCK_DISPATCH: MockDispatch = MockDispatch;

impl InterfaceDispatch for MockDispatch {
    fn new_descriptor_set_layout(
        &self,
        interface: &Ptr<Interface>,
        create_info: &DescriptorSetLayoutCreateInfo,
    ) -> Result<Ptr<DescriptorSetLayout>> {
        let counters = interface.downcast_ref::<MockInterface>()?.counters.clone();
        let layout = rhi::new_object(
            Some(interface.clone().upcast()),
            interface.object().allocator(),
            |object| MockDescriptorSetLayout {
                base: DescriptorSetLayout::new(object, create_info),
                _recorder: DropRecorder {
                    counters,
                    name: "descriptor_set_layout",
                },
            },
        )?;
        Ok(layout.upcast())
    }

    fn new_pipeline_layout(
        &self,
        interface: &Ptr<Interface>,
        create_info: &PipelineLayoutCreateInfo,
    ) -> Result<Ptr<PipelineLayout>> {
        let counters = interface.downcast_ref::<MockInterface>()?.counters.clone();
        let layout = rhi::new_object(
            Some(interface.clone().upcast()),
            interface.object().allocator(),
            |object| MockPipelineLayout {
                base: PipelineLayout::new(object, create_info),
                _recorder: DropRecorder {
                    counters,
                    name: "pipeline_layout",
                },
            },
        )?;
        Ok(layout.upcast())
    }
}

/// モックのInterfaceを作る
pub fn new_interface(allocator: &'static dyn Allocator) -> Result<(Ptr<Interface>, Arc<Counters>)> {
    let counters = Arc::new(Counters::default());
    let interface = rhi::new_object(None, allocator, |object| MockInterface {
        base: Interface::new(object, &MOCK_DISPATCH),
        counters: counters.clone(),
        _recorder: DropRecorder {
            counters: counters.clone(),
            name: "interface",
        },
    })?;
    Ok((interface.upcast(), counters))
}

/// 確保と解放を数え、`limit`回を超えた確保を失敗させるアロケータ
#[derive(Debug)]
pub struct CountingAllocator {
    limit: usize,
    allocations: AtomicUsize,
    live: AtomicUsize,
}
impl CountingAllocator {
    /// テストごとに独立したアロケータを作る
    pub fn leak(limit: usize) -> &'static Self {
        Box::leak(Box::new(Self {
            limit,
            allocations: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
        }))
    }

    pub fn unlimited() -> &'static Self {
        Self::leak(usize::MAX)
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}
impl Allocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        if self.allocations.load(Ordering::SeqCst) >= self.limit {
            return Err(rhi::Error::OutOfHostMemory {
                size: layout.size(),
                align: layout.align(),
            });
        }
        let ptr = rhi::SYSTEM_ALLOCATOR.allocate(layout)?;
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        rhi::SYSTEM_ALLOCATOR.deallocate(ptr, layout);
    }
}
