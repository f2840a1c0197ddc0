//! Lowering configuration.

use std::fmt;

use crate::layout::LayoutRule;

/// Family of buffer layout rules used for a compile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutFlavor {
    /// Relaxed std140 for cbuffers, relaxed std430 for tbuffers and
    /// structured buffers.
    #[default]
    Relaxed,
    /// Strict GLSL std140 / std430.
    Gl,
    /// Legacy fxc packing.
    Dx,
    /// Scalar block layout everywhere.
    Scalar,
}

/// Order in which stage variables without an explicit location get one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StageIoOrder {
    /// Declaration order.
    #[default]
    Declaration,
    /// Alphabetical by semantic string.
    Alphabetical,
}

/// Options that hold for a whole compile.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowerOptions {
    /// Treat matrices without a majorness annotation as row-major.
    pub default_row_major: bool,
    /// `half` and min-precision types are 16 bits wide.
    pub enable_16bit_types: bool,
    pub layout: LayoutFlavor,
    pub stage_io_order: StageIoOrder,
}

impl LowerOptions {
    /// Rule for `cbuffer`, `ConstantBuffer<T>`, and the global buffer.
    pub fn cbuffer_rule(&self) -> LayoutRule {
        match self.layout {
            LayoutFlavor::Relaxed => LayoutRule::RelaxedGlslStd140,
            LayoutFlavor::Gl => LayoutRule::GlslStd140,
            LayoutFlavor::Dx => LayoutRule::FxcCtBuffer,
            LayoutFlavor::Scalar => LayoutRule::Scalar,
        }
    }

    /// Rule for `tbuffer` and `TextureBuffer<T>`.
    pub fn tbuffer_rule(&self) -> LayoutRule {
        match self.layout {
            LayoutFlavor::Relaxed => LayoutRule::RelaxedGlslStd430,
            LayoutFlavor::Gl => LayoutRule::GlslStd430,
            LayoutFlavor::Dx => LayoutRule::FxcCtBuffer,
            LayoutFlavor::Scalar => LayoutRule::Scalar,
        }
    }

    /// Rule for structured buffers and push constants.
    pub fn sbuffer_rule(&self) -> LayoutRule {
        match self.layout {
            LayoutFlavor::Relaxed => LayoutRule::RelaxedGlslStd430,
            LayoutFlavor::Gl => LayoutRule::GlslStd430,
            LayoutFlavor::Dx => LayoutRule::FxcSBuffer,
            LayoutFlavor::Scalar => LayoutRule::Scalar,
        }
    }
}

impl fmt::Display for LowerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LowerOptions {{ default_row_major: {}, enable_16bit_types: {}, layout: {:?}, stage_io_order: {:?} }}",
            self.default_row_major, self.enable_16bit_types, self.layout, self.stage_io_order
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flavor_rules() {
        let opts = LowerOptions::default();
        assert_eq!(opts.cbuffer_rule(), LayoutRule::RelaxedGlslStd140);
        assert_eq!(opts.tbuffer_rule(), LayoutRule::RelaxedGlslStd430);
        assert_eq!(opts.sbuffer_rule(), LayoutRule::RelaxedGlslStd430);
    }

    #[test]
    fn dx_flavor_rules() {
        let opts = LowerOptions {
            layout: LayoutFlavor::Dx,
            ..LowerOptions::default()
        };
        assert_eq!(opts.cbuffer_rule(), LayoutRule::FxcCtBuffer);
        assert_eq!(opts.tbuffer_rule(), LayoutRule::FxcCtBuffer);
        assert_eq!(opts.sbuffer_rule(), LayoutRule::FxcSBuffer);
    }

    #[test]
    fn display_options() {
        let s = LowerOptions::default().to_string();
        assert!(s.contains("layout: Relaxed"));
        assert!(s.contains("stage_io_order: Declaration"));
    }
}
