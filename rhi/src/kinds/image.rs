use crate::{ImageFormat, ImageType, ImageUsageFlags, Object};
use glam::UVec3;

/// Imageのcreate info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCreateInfo {
    /// 次元
    pub image_type: ImageType,
    /// フォーマット
    pub format: ImageFormat,
    /// 大きさ
    pub extent: UVec3,
    /// mip levelの数
    pub mip_level_count: u32,
    /// array layerの数
    pub array_layer_count: u32,
    /// 用途
    pub usage: ImageUsageFlags,
}

/// Image
#[repr(C)]
pub struct Image {
    base: Object,
    info: ImageCreateInfo,
}
impl Image {
    /// create infoをコピーして作る
    pub fn new(object: Object, create_info: &ImageCreateInfo) -> Self {
        Self {
            base: object,
            info: *create_info,
        }
    }

    /// 次元
    pub fn image_type(&self) -> ImageType {
        self.info.image_type
    }

    /// フォーマット
    pub fn format(&self) -> ImageFormat {
        self.info.format
    }

    /// 大きさ
    pub fn extent(&self) -> UVec3 {
        self.info.extent
    }

    /// mip levelの数
    pub fn mip_level_count(&self) -> u32 {
        self.info.mip_level_count
    }

    /// array layerの数
    pub fn array_layer_count(&self) -> u32 {
        self.info.array_layer_count
    }

    /// 用途
    pub fn usage(&self) -> ImageUsageFlags {
        self.info.usage
    }
}
crate::impl_kind!(Image { base: Object });
