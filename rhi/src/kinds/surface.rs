use crate::Object;

/// 表示先のSurface
///
/// 作成方法はウィンドウシステムに依存するので、各バックエンドが独自の関数で作る。
#[repr(C)]
pub struct Surface {
    base: Object,
}
impl Surface {
    /// `new_object`に渡されたObjectから作る
    pub fn new(object: Object) -> Self {
        Self { base: object }
    }
}
crate::impl_kind!(Surface { base: Object });
