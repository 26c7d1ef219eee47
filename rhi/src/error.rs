//! rhiの各操作が返すエラーの定義。

use std::fmt;

/// rhiが生成できるリソースの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Interface
    Interface,
    /// DescriptorSetLayout
    DescriptorSetLayout,
    /// DescriptorSet
    DescriptorSet,
    /// PipelineLayout
    PipelineLayout,
    /// ComputePipeline
    ComputePipeline,
    /// GraphicsPipeline
    GraphicsPipeline,
    /// Buffer
    Buffer,
    /// Image
    Image,
    /// Surface
    Surface,
    /// Swapchain
    Swapchain,
    /// CommandBuffer
    CommandBuffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interface => "interface",
            Self::DescriptorSetLayout => "descriptor set layout",
            Self::DescriptorSet => "descriptor set",
            Self::PipelineLayout => "pipeline layout",
            Self::ComputePipeline => "compute pipeline",
            Self::GraphicsPipeline => "graphics pipeline",
            Self::Buffer => "buffer",
            Self::Image => "image",
            Self::Surface => "surface",
            Self::Swapchain => "swapchain",
            Self::CommandBuffer => "command buffer",
        };
        f.write_str(name)
    }
}

/// downcastに失敗したときのエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("object of kind `{found}` is not a `{expected}`")]
pub struct CastError {
    /// 要求された種類の名前
    pub expected: &'static str,
    /// オブジェクトの実際の種類の名前
    pub found: &'static str,
}

/// rhiのエラー
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// ホストのアロケータがストレージを確保できなかった
    #[error("host allocator could not provide {size} bytes (align {align})")]
    OutOfHostMemory {
        /// 要求したサイズ
        size: usize,
        /// 要求したアライメント
        align: usize,
    },

    /// ドライバの呼び出しが失敗した。ネイティブのステータスコードをそのまま保持する。
    #[error("native driver call failed with status {0}")]
    Driver(i32),

    /// バックエンドがこの種類のリソースの生成を実装していない
    #[error("{0} is not supported by this backend")]
    Unsupported(ResourceKind),

    /// 別の種類のオブジェクトが渡された
    #[error(transparent)]
    Cast(#[from] CastError),

    /// バックエンド固有のエラー
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// バックエンド固有のエラーを包む
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(error))
    }

    /// Unsupportedかどうか
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// rhiのResult
pub type Result<T, E = Error> = std::result::Result<T, E>;
