use crate::{
    convert,
    error::driver,
    guard::OnDrop,
    interface::{ensure_owned, owning_device, vulkan_interface},
};
use ash::vk;
use rhi::{
    DescriptorSetCreateInfo, DescriptorSetLayoutBinding, DescriptorSetLayoutCreateInfo,
    DescriptorType, Interface, Kind, Ptr,
};
use std::fmt::Debug;

/// VulkanのDescriptorSetLayout
#[repr(C)]
pub struct VulkanDescriptorSetLayout {
    base: rhi::DescriptorSetLayout,
    layout: vk::DescriptorSetLayout,
}
rhi::impl_kind!(VulkanDescriptorSetLayout { base: rhi::DescriptorSetLayout } => rhi::Object);

impl VulkanDescriptorSetLayout {
    /// vk::DescriptorSetLayoutを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// DescriptorSetLayoutが破棄されると、この関数で取り出したvk::DescriptorSetLayoutは無効になる。
    pub unsafe fn descriptor_set_layout_raw(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    pub(crate) fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for VulkanDescriptorSetLayout {
    fn drop(&mut self) {
        let device = owning_device(self.object());
        unsafe {
            device
                .raw()
                .destroy_descriptor_set_layout(self.layout, None)
        };
        log::debug!("destroyed descriptor set layout {:?}", self.layout);
    }
}

impl Debug for VulkanDescriptorSetLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDescriptorSetLayout")
            .field("object", self.object())
            .field("bindings", &self.base.bindings())
            .field("layout", &self.layout)
            .finish()
    }
}

pub(crate) fn new_descriptor_set_layout(
    interface: &Ptr<Interface>,
    create_info: &DescriptorSetLayoutCreateInfo,
) -> rhi::Result<Ptr<rhi::DescriptorSetLayout>> {
    let device = vulkan_interface(interface)?.selected_device()?;

    let bindings = create_info
        .bindings
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding.index)
                .descriptor_type(convert::descriptor_type(binding.descriptor_type))
                .descriptor_count(binding.descriptor_count)
                .stage_flags(convert::shader_stages(binding.stage_flags))
                .build()
        })
        .collect::<Vec<_>>();
    let layout_create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
    let layout = unsafe {
        device
            .raw()
            .create_descriptor_set_layout(&layout_create_info, None)
    }
    .map_err(driver)?;
    let layout_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_descriptor_set_layout(layout, None) })
    };

    let descriptor_set_layout = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanDescriptorSetLayout {
            base: rhi::DescriptorSetLayout::new(object, create_info),
            layout,
        },
    )?;
    layout_guard.dismiss();

    log::debug!(
        "created descriptor set layout {:?} with {} bindings",
        layout,
        bindings.len()
    );
    Ok(descriptor_set_layout.upcast())
}

/// VulkanのDescriptorSet
///
/// DescriptorSetごとに専用のdescriptor poolを持ち、破棄するときはpoolごと破棄する。
#[repr(C)]
pub struct VulkanDescriptorSet {
    base: rhi::DescriptorSet,
    pool: vk::DescriptorPool,
    set: vk::DescriptorSet,
}
rhi::impl_kind!(VulkanDescriptorSet { base: rhi::DescriptorSet } => rhi::Object);

impl VulkanDescriptorSet {
    /// vk::DescriptorSetを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// DescriptorSetが破棄されると、この関数で取り出したvk::DescriptorSetは無効になる。
    pub unsafe fn descriptor_set_raw(&self) -> vk::DescriptorSet {
        self.set
    }

    pub(crate) fn set(&self) -> vk::DescriptorSet {
        self.set
    }
}

impl Drop for VulkanDescriptorSet {
    fn drop(&mut self) {
        let device = owning_device(self.object());
        // poolの破棄でsetも解放される
        unsafe { device.raw().destroy_descriptor_pool(self.pool, None) };
        log::debug!("destroyed descriptor set {:?}", self.set);
    }
}

impl Debug for VulkanDescriptorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDescriptorSet")
            .field("object", self.object())
            .field("pool", &self.pool)
            .field("set", &self.set)
            .finish()
    }
}

/// layoutのbindingを種類ごとにまとめたpoolのサイズ
fn pool_sizes(bindings: &[DescriptorSetLayoutBinding]) -> Vec<(DescriptorType, u32)> {
    let mut sizes: Vec<(DescriptorType, u32)> = Vec::new();
    for binding in bindings {
        if binding.descriptor_count == 0 {
            continue;
        }
        match sizes
            .iter_mut()
            .find(|(ty, _)| *ty == binding.descriptor_type)
        {
            Some((_, count)) => *count += binding.descriptor_count,
            None => sizes.push((binding.descriptor_type, binding.descriptor_count)),
        }
    }
    sizes
}

pub(crate) fn new_descriptor_set(
    interface: &Ptr<Interface>,
    create_info: &DescriptorSetCreateInfo,
) -> rhi::Result<Ptr<rhi::DescriptorSet>> {
    let device = vulkan_interface(interface)?.selected_device()?;
    ensure_owned(create_info.layout.object(), interface.object())?;
    let layout = create_info
        .layout
        .downcast_ref::<VulkanDescriptorSetLayout>()?;

    // descriptor poolの作成
    let pool_sizes = pool_sizes(create_info.layout.bindings())
        .into_iter()
        .map(|(ty, descriptor_count)| {
            vk::DescriptorPoolSize::builder()
                .ty(convert::descriptor_type(ty))
                .descriptor_count(descriptor_count)
                .build()
        })
        .collect::<Vec<_>>();
    let pool_create_info = vk::DescriptorPoolCreateInfo::builder()
        .max_sets(1)
        .pool_sizes(&pool_sizes);
    let pool = unsafe { device.raw().create_descriptor_pool(&pool_create_info, None) }
        .map_err(driver)?;
    let pool_guard = {
        let device = device.raw().clone();
        OnDrop::new(move || unsafe { device.destroy_descriptor_pool(pool, None) })
    };

    // descriptor setの確保
    let set_layouts = [layout.layout()];
    let allocate_info = vk::DescriptorSetAllocateInfo::builder()
        .descriptor_pool(pool)
        .set_layouts(&set_layouts);
    let set = unsafe { device.raw().allocate_descriptor_sets(&allocate_info) }
        .map_err(driver)?
        .into_iter()
        .next()
        .ok_or_else(|| driver(vk::Result::ERROR_OUT_OF_POOL_MEMORY))?;

    let descriptor_set = rhi::new_object(
        Some(interface.clone().upcast()),
        interface.object().allocator(),
        |object| VulkanDescriptorSet {
            base: rhi::DescriptorSet::new(object, create_info),
            pool,
            set,
        },
    )?;
    pool_guard.dismiss();

    log::debug!("created descriptor set {:?}", set);
    Ok(descriptor_set.upcast())
}
