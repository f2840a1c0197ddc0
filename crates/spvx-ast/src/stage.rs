//! Shader stages and signature points.

use std::fmt;

/// A pipeline stage an entry point runs in.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel,
    Compute,
    RayGeneration,
    Intersection,
    AnyHit,
    ClosestHit,
    Miss,
    Callable,
}

impl ShaderStage {
    /// Resolves a stage from a target profile (`ps_6_0`) or a stage
    /// attribute name (`pixel`, `closesthit`).
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let stage = match lower.as_str() {
            "vertex" => Self::Vertex,
            "hull" => Self::Hull,
            "domain" => Self::Domain,
            "geometry" => Self::Geometry,
            "pixel" => Self::Pixel,
            "compute" => Self::Compute,
            "raygeneration" => Self::RayGeneration,
            "intersection" => Self::Intersection,
            "anyhit" => Self::AnyHit,
            "closesthit" => Self::ClosestHit,
            "miss" => Self::Miss,
            "callable" => Self::Callable,
            profile => match profile.split('_').next()? {
                "vs" => Self::Vertex,
                "hs" => Self::Hull,
                "ds" => Self::Domain,
                "gs" => Self::Geometry,
                "ps" => Self::Pixel,
                "cs" => Self::Compute,
                _ => return None,
            },
        };
        Some(stage)
    }

    /// Stages whose inputs carry one element per vertex or control point.
    pub fn is_multi_vertex(self) -> bool {
        matches!(self, Self::Hull | Self::Domain | Self::Geometry)
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertex => "vertex",
            Self::Hull => "hull",
            Self::Domain => "domain",
            Self::Geometry => "geometry",
            Self::Pixel => "pixel",
            Self::Compute => "compute",
            Self::RayGeneration => "raygeneration",
            Self::Intersection => "intersection",
            Self::AnyHit => "anyhit",
            Self::ClosestHit => "closesthit",
            Self::Miss => "miss",
            Self::Callable => "callable",
        };
        f.write_str(name)
    }
}

/// Stage-variable direction.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Direction {
    Input,
    Output,
}

/// What part of an entry point's interface a declaration belongs to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SigRole {
    /// An ordinary parameter or return value.
    Plain,
    /// An element of a per-vertex or per-control-point array.
    PerVertex,
    /// A parameter or return value of the hull shader's patch-constant
    /// function.
    PatchConstant,
}

/// A (stage, direction, role) classification that decides which semantics
/// are valid and how they map to builtins.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SigPoint {
    VSIn,
    VSOut,
    /// Patch-constant function inputs other than control points.
    PCIn,
    /// Hull shader inputs other than control points.
    HSIn,
    HSCPIn,
    HSCPOut,
    PCOut,
    DSIn,
    DSCPIn,
    DSOut,
    GSVIn,
    GSIn,
    GSOut,
    PSIn,
    PSOut,
    CSIn,
    Invalid,
}

impl SigPoint {
    /// Classifies a declaration of `stage` flowing in `direction`.
    pub fn classify(stage: ShaderStage, direction: Direction, role: SigRole) -> Self {
        use Direction::{Input, Output};
        match (stage, direction, role) {
            (ShaderStage::Vertex, Input, _) => Self::VSIn,
            (ShaderStage::Vertex, Output, _) => Self::VSOut,
            (ShaderStage::Hull, Input, SigRole::PerVertex) => Self::HSCPIn,
            (ShaderStage::Hull, Input, SigRole::PatchConstant) => Self::PCIn,
            (ShaderStage::Hull, Input, SigRole::Plain) => Self::HSIn,
            (ShaderStage::Hull, Output, SigRole::PatchConstant) => Self::PCOut,
            (ShaderStage::Hull, Output, _) => Self::HSCPOut,
            (ShaderStage::Domain, Input, SigRole::PerVertex) => Self::DSCPIn,
            (ShaderStage::Domain, Input, _) => Self::DSIn,
            (ShaderStage::Domain, Output, _) => Self::DSOut,
            (ShaderStage::Geometry, Input, SigRole::PerVertex) => Self::GSVIn,
            (ShaderStage::Geometry, Input, _) => Self::GSIn,
            (ShaderStage::Geometry, Output, _) => Self::GSOut,
            (ShaderStage::Pixel, Input, _) => Self::PSIn,
            (ShaderStage::Pixel, Output, _) => Self::PSOut,
            (ShaderStage::Compute, Input, _) => Self::CSIn,
            _ => Self::Invalid,
        }
    }

    pub fn is_input(self) -> bool {
        matches!(
            self,
            Self::VSIn
                | Self::PCIn
                | Self::HSIn
                | Self::HSCPIn
                | Self::DSIn
                | Self::DSCPIn
                | Self::GSVIn
                | Self::GSIn
                | Self::PSIn
                | Self::CSIn
        )
    }

    pub fn is_output(self) -> bool {
        matches!(
            self,
            Self::VSOut | Self::HSCPOut | Self::PCOut | Self::DSOut | Self::GSOut | Self::PSOut
        )
    }

    /// Signature points whose variables are per-patch rather than
    /// per-vertex.
    pub fn is_patch(self) -> bool {
        matches!(self, Self::PCOut | Self::DSIn)
    }
}

impl fmt::Display for SigPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
