//! 参照カウントを自動で管理する所有権付きのハンドル`Ptr`を定義する。

use crate::{
    cast::{self, Kind, Upcast},
    CastError, Object,
};
use std::{
    fmt::Debug,
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::Deref,
    ptr::NonNull,
};

/// リソースへの参照を一つ所有するハンドル
///
/// Cloneで参照カウントを増やし、Dropで減らす。moveではカウントは変わらない。
/// 空のハンドルは`Option<Ptr<T>>`で表す(生ポインタと同じサイズになる)。
#[repr(transparent)]
pub struct Ptr<T: Kind> {
    ptr: NonNull<T>,
    _marker: PhantomData<T>,
}
impl<T: Kind> Ptr<T> {
    /// 既に所有している参照を引き取ってPtrを作る。参照カウントは変えない。
    /// ## Safety
    /// `ptr`は`new_object`で作られた生存中のオブジェクトを指し、
    /// 呼び出し側がその参照を一つ所有していなければならない。
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// 参照カウントを増やしてPtrを作る
    /// ## Safety
    /// `ptr`は`new_object`で作られた生存中のオブジェクトを指していなければならない。
    pub unsafe fn from_raw_acquire(ptr: NonNull<T>) -> Self {
        Object::acquire(ptr.cast());
        Self::from_raw(ptr)
    }

    /// 参照カウントを減らさずにポインタを取り出す
    ///
    /// 取り出したポインタは`from_raw`で戻すか、`Object::release`で解放すること。
    pub fn into_raw(this: Self) -> NonNull<T> {
        let ptr = this.ptr;
        std::mem::forget(this);
        ptr
    }

    /// 参照カウントを変えずにポインタを取得する
    pub fn as_ptr(this: &Self) -> NonNull<T> {
        this.ptr
    }

    /// 二つのPtrが同じオブジェクトを指しているか
    pub fn ptr_eq<U: Kind>(this: &Self, other: &Ptr<U>) -> bool {
        this.ptr.cast::<u8>() == other.ptr.cast::<u8>()
    }

    /// 現在の参照カウント
    pub fn ref_count(this: &Self) -> usize {
        this.header().ref_count()
    }

    /// 祖先の型のPtrへ変換する。参照カウントは変えない。
    ///
    /// 借用しているPtrからは`clone().upcast()`で変換する。
    pub fn upcast<U>(self) -> Ptr<U>
    where
        U: Kind,
        T: Upcast<U>,
    {
        let ptr = Self::into_raw(self).cast::<U>();
        unsafe { Ptr::from_raw(ptr) }
    }

    /// 派生した型のPtrへ変換する
    ///
    /// オブジェクトの実際の種類が`U`でなければ失敗し、このPtrは破棄される。
    pub fn downcast<U>(self) -> Result<Ptr<U>, CastError>
    where
        U: Kind + Upcast<T>,
    {
        cast::check_kind(self.header(), U::info())?;
        Ok(unsafe { self.downcast_unchecked() })
    }

    /// 派生した型の参照として借用する
    pub fn downcast_ref<U>(&self) -> Result<&U, CastError>
    where
        U: Kind + Upcast<T>,
    {
        cast::check_kind(self.header(), U::info())?;
        Ok(unsafe { self.ptr.cast::<U>().as_ref() })
    }

    /// 検査せずに派生した型のPtrへ変換する
    /// ## Safety
    /// オブジェクトの実際の種類が`U`か、`U`から派生したものでなければならない。
    pub unsafe fn downcast_unchecked<U>(self) -> Ptr<U>
    where
        U: Kind + Upcast<T>,
    {
        debug_assert!(self.header().kind().is(U::info()));
        let ptr = Self::into_raw(self).cast::<U>();
        Ptr::from_raw(ptr)
    }

    fn header(&self) -> &Object {
        // Objectは常にoffset 0にある
        unsafe { self.ptr.cast::<Object>().as_ref() }
    }
}

// Tの中身はSendかつSyncなのでPtrはSend
unsafe impl<T: Kind> Send for Ptr<T> {}
// Tの中身はSendかつSyncなのでPtrはSync
unsafe impl<T: Kind> Sync for Ptr<T> {}

// PtrはTにDerefする
impl<T: Kind> Deref for Ptr<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        unsafe { self.ptr.as_ref() }
    }
}

// Cloneで参照カウントを増やす
impl<T: Kind> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        unsafe { Self::from_raw_acquire(self.ptr) }
    }
}

// Drop時に参照カウントを減らし、0になったら破棄する
impl<T: Kind> Drop for Ptr<T> {
    fn drop(&mut self) {
        unsafe { Object::release(self.ptr.cast()) }
    }
}

// 同じオブジェクトを指しているかで比較する
impl<T: Kind> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}
impl<T: Kind> Eq for Ptr<T> {}

impl<T: Kind> Hash for Ptr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
    }
}

impl<T: Kind> Debug for Ptr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ptr")
            .field("kind", &self.header().kind().name())
            .field("address", &self.ptr)
            .field("ref_count", &self.header().ref_count())
            .finish()
    }
}
