//! 事前に宣言された閉じた型階層と、その上のupcast / downcastを定義する。
//!
//! 各リソースの型は基底の型を先頭(offset 0)のフィールドに持つ。
//! upcastはそのフィールドを辿るだけなので常に安全で、コンパイル時に解決される。
//! downcastはObjectに記録された最も派生した種類を辿って検査してから行う。

use crate::{CastError, Object, Ptr};
use std::fmt::Debug;

/// 型階層の一つの種類を表す静的な情報
pub struct KindInfo {
    name: &'static str,
    base: Option<fn() -> &'static KindInfo>,
}
impl KindInfo {
    /// `impl_kind!`から使う
    #[doc(hidden)]
    pub const fn new(name: &'static str, base: Option<fn() -> &'static KindInfo>) -> Self {
        Self { name, base }
    }

    /// 種類の名前
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 基底の種類。Objectならなし。
    pub fn base(&self) -> Option<&'static KindInfo> {
        self.base.map(|base| base())
    }

    /// 自分自身から始まり、基底の種類を順に辿るイテレータ
    pub fn ancestors(&'static self) -> impl Iterator<Item = &'static KindInfo> {
        std::iter::successors(Some(self), |info| info.base())
    }

    /// 自分が`other`そのものか、`other`から派生しているか
    pub fn is(&'static self, other: &'static KindInfo) -> bool {
        self.ancestors().any(|info| std::ptr::eq(info, other))
    }
}

impl Debug for KindInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// 型階層に属する型
/// ## Safety
/// 実装する型はObjectを先頭に持つ基底の連鎖をoffset 0に埋め込み、
/// `new_object`の中でしか値を作らないこと。`impl_kind!`で実装すること。
pub unsafe trait Kind: Send + Sync + 'static {
    /// この種類の静的な情報
    fn info() -> &'static KindInfo
    where
        Self: Sized;

    /// 埋め込まれたObjectを取得する
    fn object(&self) -> &Object;
}

/// 単一の基底を持つ型。`get_base`にあたる。
pub trait Derived: Kind {
    /// 直接の基底の型
    type Base: Kind;

    /// 埋め込まれた基底を取得する
    fn base(&self) -> &Self::Base;
}

/// `Target`へupcastできる型
/// ## Safety
/// `Target`は自分自身か、offset 0に埋め込まれた祖先でなければならない。
pub unsafe trait Upcast<Target: Kind>: Kind {
    /// `Target`の部分への参照を取得する
    fn upcast_ref(&self) -> &Target;
}

unsafe impl<T: Kind> Upcast<T> for T {
    fn upcast_ref(&self) -> &T {
        self
    }
}

unsafe impl Kind for Object {
    fn info() -> &'static KindInfo {
        static INFO: KindInfo = KindInfo::new("Object", None);
        &INFO
    }

    fn object(&self) -> &Object {
        self
    }
}

/// 型を型階層に登録する
///
/// `impl_kind!(Type { field: Base } => Ancestor => ...);`のように、
/// 基底を埋め込んだフィールドと直接の基底、その先の祖先をObjectまですべて並べる。
/// 基底のフィールドがoffset 0にあることはコンパイル時に検査される。
#[macro_export]
macro_rules! impl_kind {
    ($ty:ty { $field:ident : $base:ty } $(=> $ancestor:ty)* $(;)?) => {
        const _: () = ::core::assert!(::core::mem::offset_of!($ty, $field) == 0);

        unsafe impl $crate::Kind for $ty {
            fn info() -> &'static $crate::KindInfo {
                static INFO: $crate::KindInfo = $crate::KindInfo::new(
                    ::core::concat!(::core::module_path!(), "::", ::core::stringify!($ty)),
                    ::core::option::Option::Some(
                        <$base as $crate::Kind>::info as fn() -> &'static $crate::KindInfo,
                    ),
                );
                &INFO
            }

            fn object(&self) -> &$crate::Object {
                $crate::Kind::object(&self.$field)
            }
        }

        impl $crate::Derived for $ty {
            type Base = $base;

            fn base(&self) -> &$base {
                &self.$field
            }
        }

        unsafe impl $crate::Upcast<$base> for $ty {
            fn upcast_ref(&self) -> &$base {
                &self.$field
            }
        }

        $(
            unsafe impl $crate::Upcast<$ancestor> for $ty {
                fn upcast_ref(&self) -> &$ancestor {
                    $crate::Upcast::<$ancestor>::upcast_ref(&self.$field)
                }
            }
        )*
    };
}

/// 参照を祖先の型の参照へupcastする
pub fn upcast<Target, T>(value: &T) -> &Target
where
    Target: Kind,
    T: Upcast<Target>,
{
    value.upcast_ref()
}

/// Ptrを祖先の型のPtrへupcastする
pub fn upcast_ptr<Target, T>(ptr: Ptr<T>) -> Ptr<Target>
where
    Target: Kind,
    T: Upcast<Target>,
{
    ptr.upcast()
}

/// Ptrを派生した型のPtrへdowncastする
pub fn downcast<Target, T>(ptr: Ptr<T>) -> Result<Ptr<Target>, CastError>
where
    Target: Kind + Upcast<T>,
    T: Kind,
{
    ptr.downcast()
}

pub(crate) fn check_kind(object: &Object, target: &'static KindInfo) -> Result<(), CastError> {
    if object.kind().is(target) {
        Ok(())
    } else {
        Err(CastError {
            expected: target.name(),
            found: object.kind().name(),
        })
    }
}
