//! Semantic strings and their mapping onto builtins and locations.

use std::fmt;

use spvx_ast::{SigPoint, SourceLocation};
use spvx_ir::{BuiltIn, Capability, Extension};

/// The role a semantic name plays.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum SemanticKind {
    /// A user-defined semantic.
    Arbitrary,
    Position,
    VertexId,
    InstanceId,
    ClipDistance,
    CullDistance,
    IsFrontFace,
    Depth,
    DepthGreaterEqual,
    DepthLessEqual,
    Target,
    DispatchThreadId,
    GroupId,
    GroupThreadId,
    GroupIndex,
    OutputControlPointId,
    GsInstanceId,
    PrimitiveId,
    TessFactor,
    InsideTessFactor,
    DomainLocation,
    SampleIndex,
    Coverage,
    InnerCoverage,
    StencilRef,
    RenderTargetArrayIndex,
    ViewportArrayIndex,
    ViewId,
    /// An `SV_` name that is not a known system value.
    Invalid,
}

impl SemanticKind {
    /// Resolves a semantic name (without its index). System-value names are
    /// matched case-insensitively.
    pub fn from_name(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        let Some(sv) = upper.strip_prefix("SV_") else {
            return Self::Arbitrary;
        };
        match sv {
            "POSITION" => Self::Position,
            "VERTEXID" => Self::VertexId,
            "INSTANCEID" => Self::InstanceId,
            "CLIPDISTANCE" => Self::ClipDistance,
            "CULLDISTANCE" => Self::CullDistance,
            "ISFRONTFACE" => Self::IsFrontFace,
            "DEPTH" => Self::Depth,
            "DEPTHGREATEREQUAL" => Self::DepthGreaterEqual,
            "DEPTHLESSEQUAL" => Self::DepthLessEqual,
            "TARGET" => Self::Target,
            "DISPATCHTHREADID" => Self::DispatchThreadId,
            "GROUPID" => Self::GroupId,
            "GROUPTHREADID" => Self::GroupThreadId,
            "GROUPINDEX" => Self::GroupIndex,
            "OUTPUTCONTROLPOINTID" => Self::OutputControlPointId,
            "GSINSTANCEID" => Self::GsInstanceId,
            "PRIMITIVEID" => Self::PrimitiveId,
            "TESSFACTOR" => Self::TessFactor,
            "INSIDETESSFACTOR" => Self::InsideTessFactor,
            "DOMAINLOCATION" => Self::DomainLocation,
            "SAMPLEINDEX" => Self::SampleIndex,
            "COVERAGE" => Self::Coverage,
            "INNERCOVERAGE" => Self::InnerCoverage,
            "STENCILREF" => Self::StencilRef,
            "RENDERTARGETARRAYINDEX" => Self::RenderTargetArrayIndex,
            "VIEWPORTARRAYINDEX" => Self::ViewportArrayIndex,
            "VIEWID" => Self::ViewId,
            _ => Self::Invalid,
        }
    }
}

/// A parsed semantic: `TEXCOORD3` is name `TEXCOORD`, index 3.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Semantic {
    /// The full string as written, or as synthesized for an inherited
    /// semantic.
    pub string: String,
    pub name: String,
    pub index: u32,
    pub kind: SemanticKind,
    pub loc: SourceLocation,
}

impl Semantic {
    ///
    /// Returns `None` when the index does not fit in a `u32`.
    pub fn parse(string: &str, loc: SourceLocation) -> Option<Self> {
        let name = string.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &string[name.len()..];
        let index = if digits.is_empty() { 0 } else { digits.parse().ok()? };
        Some(Self {
            string: string.to_string(),
            name: name.to_string(),
            index,
            kind: SemanticKind::from_name(name),
            loc,
        })
    }

    /// The same semantic name with a different index.
    pub fn with_index(&self, index: u32) -> Self {
        Self {
            string: format!("{}{index}", self.name),
            index,
            ..self.clone()
        }
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

// ---------------------------------------------------------------------------
// Builtin mapping
// ---------------------------------------------------------------------------

/// Where a stage variable lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    /// A location-bound interface variable.
    Location,
    BuiltIn(BuiltIn),
    /// Packed into the shared clip/cull distance array.
    ClipCull,
}

/// A placement and what the module must declare to use it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub placement: Placement,
    pub capability: Option<Capability>,
    pub extension: Option<Extension>,
}

impl Resolved {
    fn location() -> Option<Self> {
        Some(Self::from(Placement::Location))
    }

    fn builtin(builtin: BuiltIn) -> Option<Self> {
        Some(Self::from(Placement::BuiltIn(builtin)))
    }

    fn requiring(mut self, capability: Capability, extension: Option<Extension>) -> Self {
        self.capability = Some(capability);
        self.extension = extension;
        self
    }
}

impl From<Placement> for Resolved {
    fn from(placement: Placement) -> Self {
        Self {
            placement,
            capability: None,
            extension: None,
        }
    }
}

/// Maps a semantic kind at a signature point to its placement. `None`
/// means the semantic is not allowed there.
pub(crate) fn resolve_semantic(kind: SemanticKind, sig: SigPoint) -> Option<Resolved> {
    use SigPoint::*;
    use SemanticKind as K;

    match (kind, sig) {
        (_, Invalid) | (K::Invalid, _) => None,
        (K::Arbitrary, CSIn) => None,
        (K::Arbitrary, _) => Resolved::location(),

        (K::VertexId, VSIn) => Resolved::builtin(BuiltIn::VertexIndex),
        (K::VertexId, CSIn | PSOut) => None,
        (K::VertexId, _) => Resolved::location(),

        (K::InstanceId, VSIn) => Resolved::builtin(BuiltIn::InstanceIndex),
        (K::InstanceId, CSIn | PSOut) => None,
        (K::InstanceId, _) => Resolved::location(),

        (K::Position, VSIn) => Resolved::location(),
        (K::Position, PSIn) => Resolved::builtin(BuiltIn::FragCoord),
        (K::Position, VSOut | HSCPIn | HSCPOut | DSCPIn | DSOut | GSVIn | GSOut) => {
            Resolved::builtin(BuiltIn::Position)
        }

        (K::ClipDistance | K::CullDistance, VSIn) => Resolved::location(),
        (
            K::ClipDistance | K::CullDistance,
            VSOut | HSCPIn | HSCPOut | DSCPIn | DSOut | GSVIn | GSOut | PSIn,
        ) => Some(Placement::ClipCull.into()),

        (K::IsFrontFace, PSIn) => Resolved::builtin(BuiltIn::FrontFacing),
        (K::Depth | K::DepthGreaterEqual | K::DepthLessEqual, PSOut) => {
            Resolved::builtin(BuiltIn::FragDepth)
        }
        (K::Target, PSOut) => Resolved::location(),

        (K::DispatchThreadId, CSIn) => Resolved::builtin(BuiltIn::GlobalInvocationId),
        (K::GroupId, CSIn) => Resolved::builtin(BuiltIn::WorkgroupId),
        (K::GroupThreadId, CSIn) => Resolved::builtin(BuiltIn::LocalInvocationId),
        (K::GroupIndex, CSIn) => Resolved::builtin(BuiltIn::LocalInvocationIndex),

        (K::OutputControlPointId, HSIn) | (K::GsInstanceId, GSIn) => {
            Resolved::builtin(BuiltIn::InvocationId)
        }
        (K::PrimitiveId, PCIn | HSIn | DSIn | GSIn | GSOut | PSIn) => {
            Resolved::builtin(BuiltIn::PrimitiveId)
        }

        (K::TessFactor, PCOut | DSIn) => Resolved::builtin(BuiltIn::TessLevelOuter),
        (K::InsideTessFactor, PCOut | DSIn) => Resolved::builtin(BuiltIn::TessLevelInner),
        (K::DomainLocation, DSIn) => Resolved::builtin(BuiltIn::TessCoord),

        (K::SampleIndex, PSIn) => Resolved::builtin(BuiltIn::SampleId)
            .map(|r| r.requiring(Capability::SampleRateShading, None)),
        (K::Coverage, PSIn | PSOut) => Resolved::builtin(BuiltIn::SampleMask),
        (K::InnerCoverage, PSIn) => Resolved::builtin(BuiltIn::FullyCovered).map(|r| {
            r.requiring(
                Capability::FragmentFullyCoveredEXT,
                Some(Extension::FragmentFullyCovered),
            )
        }),
        (K::StencilRef, PSOut) => Resolved::builtin(BuiltIn::FragStencilRef)
            .map(|r| r.requiring(Capability::StencilExportEXT, Some(Extension::ShaderStencilExport))),

        (K::RenderTargetArrayIndex | K::ViewportArrayIndex, sig) => {
            let builtin = if kind == K::RenderTargetArrayIndex {
                BuiltIn::Layer
            } else {
                BuiltIn::ViewportIndex
            };
            match sig {
                VSIn | HSCPIn | HSCPOut | PCIn | DSIn | DSCPIn | GSVIn => Resolved::location(),
                VSOut | DSOut => Resolved::builtin(builtin).map(|r| {
                    r.requiring(
                        Capability::ShaderViewportIndexLayerEXT,
                        Some(Extension::ShaderViewportIndexLayer),
                    )
                }),
                GSOut | PSIn => {
                    Resolved::builtin(builtin).map(|r| r.requiring(Capability::Geometry, None))
                }
                _ => None,
            }
        }

        (K::ViewId, VSIn | PCIn | HSIn | DSIn | GSIn | PSIn) => Resolved::builtin(BuiltIn::ViewIndex)
            .map(|r| r.requiring(Capability::MultiView, Some(Extension::Multiview))),

        _ => None,
    }
}

/// Builtin names accepted by `[[vk::builtin("...")]]`.
pub(crate) const VK_BUILTINS: &[&str] = &[
    "PointSize",
    "HelperInvocation",
    "BaseVertex",
    "BaseInstance",
    "DrawIndex",
    "DeviceIndex",
];

/// Maps a `vk::builtin` name at a signature point. `None` means the name is
/// unknown or not allowed there.
pub(crate) fn resolve_vk_builtin(name: &str, sig: SigPoint) -> Option<Resolved> {
    use SigPoint::*;

    let draw = |builtin| {
        Resolved::builtin(builtin)
            .map(|r| r.requiring(Capability::DrawParameters, Some(Extension::ShaderDrawParameters)))
    };
    match (name, sig) {
        ("PointSize", VSOut | HSCPIn | HSCPOut | DSCPIn | DSOut | GSVIn | GSOut) => {
            Resolved::builtin(BuiltIn::PointSize)
        }
        ("HelperInvocation", PSIn) => Resolved::builtin(BuiltIn::HelperInvocation),
        ("BaseVertex", VSIn) => draw(BuiltIn::BaseVertex),
        ("BaseInstance", VSIn) => draw(BuiltIn::BaseInstance),
        ("DrawIndex", VSIn) => draw(BuiltIn::DrawIndex),
        ("DeviceIndex", sig) if sig.is_input() => Resolved::builtin(BuiltIn::DeviceIndex)
            .map(|r| r.requiring(Capability::DeviceGroup, Some(Extension::DeviceGroup))),
        _ => None,
    }
}
