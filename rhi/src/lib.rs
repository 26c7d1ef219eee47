//! 参照カウント付きのリソースと、バックエンドを差し替え可能なInterfaceを提供する。
//!
//! すべてのリソースは先頭に[`Object`]を埋め込んだレコードで、[`Ptr`]で所有する。
//! リソースは自分を作ったInterfaceへの参照を保持しており、
//! Interfaceは自分が作ったリソースがすべて破棄されるまで生き続ける。

mod alloc;
pub use alloc::{Allocator, SystemAllocator, SYSTEM_ALLOCATOR};
mod cast;
pub use cast::{downcast, upcast, upcast_ptr, Derived, Kind, KindInfo, Upcast};
mod error;
pub use error::{CastError, Error, ResourceKind, Result};
mod flags;
pub use flags::*;
mod kinds;
pub use kinds::*;
mod object;
pub use object::{new_object, Deleter, Object};
mod ptr;
pub use ptr::Ptr;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_descriptors_form_a_chain_to_object() {
        let info = DescriptorSetLayout::info();
        assert!(info.name().ends_with("DescriptorSetLayout"));
        assert!(std::ptr::eq(info.base().unwrap(), Object::info()));
        assert!(Object::info().base().is_none());
        assert_eq!(info.ancestors().count(), 2);
    }

    #[test]
    fn kind_relation_follows_the_declared_hierarchy() {
        assert!(Buffer::info().is(Buffer::info()));
        assert!(Buffer::info().is(Object::info()));
        assert!(!Buffer::info().is(Image::info()));
        assert!(!Object::info().is(Buffer::info()));
    }

    #[test]
    fn every_kind_has_a_distinct_descriptor() {
        let infos = [
            Interface::info(),
            DescriptorSetLayout::info(),
            DescriptorSet::info(),
            PipelineLayout::info(),
            ComputePipeline::info(),
            GraphicsPipeline::info(),
            Buffer::info(),
            Image::info(),
            Surface::info(),
            Swapchain::info(),
            CommandBuffer::info(),
        ];
        for (i, a) in infos.iter().enumerate() {
            for b in &infos[i + 1..] {
                assert!(!std::ptr::eq(*a, *b));
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn empty_handle_is_pointer_sized() {
        assert_eq!(
            std::mem::size_of::<Option<Ptr<Buffer>>>(),
            std::mem::size_of::<*const Buffer>()
        );
    }

    #[test]
    fn unsupported_error_names_the_kind() {
        let error = Error::Unsupported(ResourceKind::Swapchain);
        assert!(error.is_unsupported());
        assert_eq!(error.to_string(), "swapchain is not supported by this backend");
    }
}
