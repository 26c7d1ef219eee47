//! すべてのリソースの先頭に埋め込まれる参照カウント付きのObjectを定義する。
//!
//! 参照カウントの実装は「詳解 Rustアトミック操作とロック」のArcの実装を参考にしている。
//! メモリのOrderingなどは、それに準拠している。

use crate::{
    alloc::StorageGuard,
    cast::{Kind, KindInfo},
    Allocator, Ptr, Result,
};
use std::{
    alloc::Layout,
    fmt::Debug,
    mem::ManuallyDrop,
    ptr::NonNull,
    sync::atomic::{fence, AtomicUsize, Ordering},
};

/// 参照カウントが0になったときに呼ばれる関数
pub type Deleter = unsafe fn(NonNull<Object>);

/// すべてのリソースの先頭(offset 0)に埋め込まれる共通のヘッダ
///
/// `new_object`の中でしか作れない。
/// 作られたObjectは必ず`Allocator`で確保したストレージの中に置かれる。
#[repr(C)]
pub struct Object {
    // deleterの中で明示的に解放する
    parent: ManuallyDrop<Option<Ptr<Object>>>,
    deleter: Deleter,
    allocator: &'static dyn Allocator,
    kind: &'static KindInfo,
    ref_count: AtomicUsize,
}
impl Object {
    /// 親のObjectを取得する
    pub fn parent(&self) -> Option<&Ptr<Object>> {
        self.parent.as_ref()
    }

    /// 最も派生した種類の情報を取得する
    pub fn kind(&self) -> &'static KindInfo {
        self.kind
    }

    /// このObjectのストレージを確保したアロケータを取得する
    pub fn allocator(&self) -> &'static dyn Allocator {
        self.allocator
    }

    /// 現在の参照カウントを取得する
    ///
    /// 他のスレッドが同時に参照を増減していれば、返した時点で値は古くなっている。
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Relaxed)
    }

    /// 参照カウントを増やし、同じポインタを返す
    /// ## Safety
    /// `this`は生存しているObjectを指していなければならない。
    pub unsafe fn acquire(this: NonNull<Object>) -> NonNull<Object> {
        if this.as_ref().ref_count.fetch_add(1, Ordering::Relaxed) > usize::MAX / 2 {
            std::process::abort();
        }
        this
    }

    /// 参照カウントを減らし、0になったらdeleterを呼ぶ
    /// ## Safety
    /// 呼び出し側は`this`への参照を一つ所有していなければならない。
    /// この呼び出しの後、その参照は使えない。
    pub unsafe fn release(this: NonNull<Object>) {
        if this.as_ref().ref_count.fetch_sub(1, Ordering::Release) == 1 {
            fence(Ordering::Acquire);
            let deleter = this.as_ref().deleter;
            deleter(this);
        }
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("kind", &self.kind.name())
            .field("parent", &self.parent().map(|parent| parent.kind().name()))
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// `T`をアロケータで確保したストレージに作成し、参照カウント1のPtrを返す
///
/// `init`は渡されたObjectを`T`の基底の連鎖の先頭に埋め込まなければならない。
/// 別の`new_object`に渡されたObjectを埋め込んだ場合はpanicする。
/// ストレージの確保に失敗した場合`init`は呼ばれず、`parent`と`init`が捕捉した値はそのまま破棄される。
pub fn new_object<T, F>(
    parent: Option<Ptr<Object>>,
    allocator: &'static dyn Allocator,
    init: F,
) -> Result<Ptr<T>>
where
    T: Kind,
    F: FnOnce(Object) -> T,
{
    let storage = StorageGuard::allocate(allocator, Layout::new::<T>())?;

    let object = Object {
        parent: ManuallyDrop::new(parent),
        deleter: delete::<T>,
        allocator,
        kind: T::info(),
        ref_count: AtomicUsize::new(1),
    };
    let value = init(object);
    // 別のnew_objectに渡されたObjectを埋め込まれると、deleterとLayoutが食い違う
    let header = value.object();
    assert!(
        std::ptr::eq(header.kind, T::info()),
        "{} was initialized with the header of {}",
        T::info().name(),
        header.kind.name()
    );
    assert!(
        std::ptr::addr_eq(header.allocator, allocator),
        "{} was initialized with a header from another allocator",
        T::info().name()
    );

    let ptr = storage.as_ptr().cast::<T>();
    unsafe { ptr.as_ptr().write(value) };
    storage.release();

    log::trace!("created {}", T::info().name());
    Ok(unsafe { Ptr::from_raw(ptr) })
}

// 型ごとのdeleter。
// 中身の破棄 -> 親の解放 -> ストレージの解放の順で行う。
unsafe fn delete<T: Kind>(this: NonNull<Object>) {
    let (allocator, parent) = {
        let header = this.as_ref();
        (header.allocator, std::ptr::read(&header.parent))
    };
    log::trace!("deleting {}", T::info().name());

    // Tのdropの中からはまだ親にアクセスできる
    std::ptr::drop_in_place(this.cast::<T>().as_ptr());
    drop(ManuallyDrop::into_inner(parent));

    allocator.deallocate(this.cast::<u8>(), Layout::new::<T>());
}
