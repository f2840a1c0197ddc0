//! Capability and extension requirements raised while building a module.

/// A capability the emitted module declares.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Capability {
    Shader,
    Int16,
    Float16,
    Int64,
    Float64,
    StorageInputOutput16,
    Image1D,
    Sampled1D,
    ImageBuffer,
    SampledBuffer,
    ImageCubeArray,
    SampledCubeArray,
    StorageImageExtendedFormats,
    InputAttachment,
    ClipDistance,
    CullDistance,
    SampleRateShading,
    Geometry,
    ShaderViewportIndexLayerEXT,
    StencilExportEXT,
    FragmentFullyCoveredEXT,
    DrawParameters,
    DeviceGroup,
    MultiView,
    RuntimeDescriptorArrayEXT,
}

/// An extension the emitted module enables.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Extension {
    DescriptorIndexing,
    ShaderViewportIndexLayer,
    ShaderStencilExport,
    FragmentFullyCovered,
    ShaderDrawParameters,
    DeviceGroup,
    Multiview,
    Storage16Bit,
}

impl Extension {
    /// The extension's registered name.
    pub fn name(self) -> &'static str {
        match self {
            Self::DescriptorIndexing => "SPV_EXT_descriptor_indexing",
            Self::ShaderViewportIndexLayer => "SPV_EXT_shader_viewport_index_layer",
            Self::ShaderStencilExport => "SPV_EXT_shader_stencil_export",
            Self::FragmentFullyCovered => "SPV_EXT_fragment_fully_covered",
            Self::ShaderDrawParameters => "SPV_KHR_shader_draw_parameters",
            Self::DeviceGroup => "SPV_KHR_device_group",
            Self::Multiview => "SPV_KHR_multiview",
            Self::Storage16Bit => "SPV_KHR_16bit_storage",
        }
    }
}
