use crate::{ImageFormat, ImageUsageFlags, Object, Ptr, Surface};
use glam::UVec2;

/// Swapchainのcreate info
#[derive(Debug, Clone, Copy)]
pub struct SwapchainCreateInfo<'a> {
    /// 表示先のsurface
    pub surface: &'a Ptr<Surface>,
    /// 希望する大きさ。surfaceが大きさを決めている場合はそちらが優先される。
    pub extent: UVec2,
    /// swapchainのimageの用途
    pub usage: ImageUsageFlags,
}

/// Swapchain
///
/// 表示先のsurfaceへの参照を保持する。
#[repr(C)]
pub struct Swapchain {
    base: Object,
    surface: Ptr<Surface>,
    format: ImageFormat,
    extent: UVec2,
    image_count: u32,
}
impl Swapchain {
    /// surfaceへの参照を一つ増やして作る。formatなどはバックエンドが実際に選んだ値を渡す。
    pub fn new(
        object: Object,
        surface: &Ptr<Surface>,
        format: ImageFormat,
        extent: UVec2,
        image_count: u32,
    ) -> Self {
        Self {
            base: object,
            surface: surface.clone(),
            format,
            extent,
            image_count,
        }
    }

    /// 表示先のsurface
    pub fn surface(&self) -> &Ptr<Surface> {
        &self.surface
    }

    /// imageのフォーマット
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// imageの大きさ
    pub fn extent(&self) -> UVec2 {
        self.extent
    }

    /// imageの数
    pub fn image_count(&self) -> u32 {
        self.image_count
    }
}
crate::impl_kind!(Swapchain { base: Object });
