#![warn(missing_docs)]
//! Scribe Core - the editing core of a source-code editor
//!
//! # Overview
//!
//! `scribe-core` holds everything an editor needs between the keyboard and the renderer:
//! text storage, line lookup, lexical styles, indicators, folding, multi-range selections and
//! an undo log that also restores the selection. It draws nothing. Platform services (font
//! measurement, clipboard, pop-up lists, context menus) are traits the host implements.
//!
//! # Core Features
//!
//! - **Gap Buffer Storage**: amortised O(1) insertion and deletion near the last edit
//! - **Lazy Line Partitioning**: line lookups in O(log n), with pending shifts applied on demand
//! - **Run-Length Styles**: per-byte styles and indicators stored as runs
//! - **Selection-Aware Undo**: typing coalesces into one step, and undo restores the selection
//! - **Shared Documents**: several views over one document, each with its own selection
//! - **Code Folding**: fold levels on the document, per-line visibility and expansion
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditModel (selection, caret, IME, commands)│  ← Per-view API
//! ├─────────────────────────────────────────────┤
//! │  ViewStyle / Style / Indicator              │  ← Appearance
//! ├─────────────────────────────────────────────┤
//! │  Document (views, listeners, folding)       │  ← Shared model
//! ├─────────────────────────────────────────────┤
//! │  CellBuffer (text, styles, lines, undo)     │  ← Storage
//! ├─────────────────────────────────────────────┤
//! │  SplitVector / Partitioning / RunStyles     │  ← Containers
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use scribe_core::{Document, DocumentHandle, EditModel, ViewOptions};
//!
//! let doc = DocumentHandle::new(Document::from_text("fn main() {}\n"));
//! let mut view = EditModel::new(doc.add_ref(), &ViewOptions::default());
//!
//! view.set_empty_selection(11).unwrap();
//! for ch in " 42 ".chars() {
//!     view.insert_character(ch).unwrap();
//! }
//! assert_eq!(doc.borrow().text(), "fn main() { 42 }\n");
//!
//! // The four keystrokes undo as one step and the caret returns to where typing began.
//! view.undo().unwrap();
//! assert_eq!(doc.borrow().text(), "fn main() {}\n");
//! assert_eq!(view.selection().main_caret(), 11);
//! ```
//!
//! # Module Description
//!
//! - [`split_vector`], [`partitioning`], [`run_styles`] - generic containers
//! - [`cell_buffer`], [`undo_history`] - text storage and the undo log
//! - [`document`] - the shared document, its views and listeners
//! - [`selection`], [`model_state`] - selections and their undo snapshots
//! - [`edit_model`] - per-view editing
//! - [`style`], [`indicator`], [`view_style`] - appearance
//! - [`loader`] - building documents off the editing thread
//! - [`config`] - TOML configuration

pub mod cell_buffer;
pub mod config;
pub mod contraction_state;
pub mod decoration;
pub mod document;
pub mod edit_model;
pub mod error;
pub mod indicator;
pub mod key_map;
pub mod line_ending;
pub mod loader;
pub mod model_state;
pub mod modification;
pub mod partitioning;
pub mod platform;
pub mod processing;
pub mod run_styles;
pub mod search;
pub mod selection;
pub mod split_vector;
pub mod style;
pub mod undo_history;
pub mod view_style;

pub use cell_buffer::{CellBuffer, CellChange};
pub use config::{ConfigError, DocumentOptions, EditorConfig, ViewOptions};
pub use contraction_state::ContractionState;
pub use decoration::DecorationList;
pub use document::{Document, DocumentEvent, DocumentHandle, FoldLevel, ListenerId, ViewId};
pub use edit_model::{Bidirectional, Caret, EditModel, FoldAction, FoldDisplayTextStyle, ImeSegment};
pub use error::{CoreError, CoreResult};
pub use indicator::{Indicator, IndicatorStyle};
pub use key_map::{EditorCommand, KeyMap, KeyMod, Keys};
pub use line_ending::LineEnding;
pub use loader::{LoadStatus, Loader};
pub use model_state::{ModelState, UndoSelectionHistory};
pub use modification::{DocModification, ModificationFlags};
pub use partitioning::Partitioning;
pub use platform::{Clipboard, ContextMenu, ListPopup, MenuCommand, TextSurface};
pub use processing::{DocumentProcessor, ProcessingEdit};
pub use run_styles::{FillResult, RunStyles};
pub use search::{SearchError, SearchOptions};
pub use selection::{Range, Selection, SelectionPosition, SelectionRange, SelectionType};
pub use split_vector::SplitVector;
pub use style::{ColourRgba, FontSpecification, Style};
pub use undo_history::{ActionType, UndoAction, UndoHistory};
pub use view_style::ViewStyle;
