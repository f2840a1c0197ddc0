//! Type, layout, and binding lowering for spvx.
//!
//! Takes the declarations a front end produced (see `spvx-ast`) and emits
//! the matching types, variables, decorations, and capability requirements
//! into an `spvx-ir` [`Module`](spvx_ir::Module):
//!
//! - [`TypeTranslator`] maps source types to IR types under a buffer layout
//!   rule, computing offsets, strides, and matrix decorations.
//! - [`Binder`] creates stage input/output variables with locations and
//!   builtins, buffer blocks and resource globals with descriptor bindings,
//!   and private/function variables that may alias buffers.
//! - [`ClipCullPacker`] packs clip and cull distance declarations into one
//!   builtin array per direction.
//! - [`CounterVarFields`] tracks the hidden counters of append/consume
//!   buffers, including through aliasing locals.
//!
//! Recoverable problems land in [`Diagnostics`]; only fatal ones surface as
//! [`LowerError`].

mod alias;
mod binder;
mod clip_cull;
mod counter;
mod diag;
mod error;
pub mod layout;
mod options;
mod resource;
mod semantic;
mod stage;
mod translate;

pub use binder::{Binder, Lowered};
pub use clip_cull::{ClipCullKind, ClipCullPacker, PackedAccess};
pub use counter::{CounterCopy, CounterEntry, CounterVarFields, IndexPath};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use error::{CounterError, LowerError};
pub use layout::{Layout, LayoutRule};
pub use options::{LayoutFlavor, LowerOptions, StageIoOrder};
pub use resource::ResourceVar;
pub use semantic::{Semantic, SemanticKind};
pub use stage::StageVar;
pub use translate::{BlockKind, TypeTranslator};
