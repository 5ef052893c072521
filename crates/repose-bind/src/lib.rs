//! # Data-bound views
//!
//! Views that render a live data source as a list of child components and
//! keep that list in step with the source's change events.
//!
//! - [`CollectionView`] follows an ordered [`Collection`]: one child per item,
//!   positional `add` / `remove`.
//! - [`RecordView`] follows a keyed [`Record`]: one child per shown key; a
//!   changed value replaces its child.
//! - [`CollectionSelect`] is a `select` whose options follow a [`Collection`]
//!   and whose selection survives the options changing.
//! - [`BoundComponent`] and [`BoundText`] update a single component from any
//!   [`Observable`]; [`BoundComponent::with_value`] drives form controls
//!   ([`TextInput`], [`Toggle`]) from a returned value.
//!
//! Both views are built from the same three pieces: a [`ChangeListener`]
//! that owns the subscription, a [`KeyedReconciler`] that owns the child
//! records and their enter/exit transitions, and a [`SyncBarrier`] that tells
//! callers when the children match the source again.
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use repose_core::*;
//! use repose_bind::*;
//!
//! let host: Rc<dyn VisualHost> = Rc::new(MemoryHost::new());
//! let todos = Rc::new(ObservableList::new(["milk".to_string(), "eggs".to_string()]));
//!
//! let mut view = CollectionView::new(
//!     Some(todos.clone()),
//!     |item: &String, _| Ok(Label::new(item.clone()).into()),
//!     CollectionViewOptions::default(),
//! );
//! view.render(&host, root)?;
//!
//! todos.push("bread".into())?;
//! view.sync(|| log::info!("list is up to date"));
//! ```
//!
//! ## Exits
//!
//! With a [`Transition`] configured, a removed child stays in place until its
//! exit finishes, while the list itself already reflects the removal. Exits
//! that are still running when the view unrenders are cancelled and the
//! children torn down at once.

pub mod bound;
pub mod collection_view;
pub mod control;
pub mod listener;
pub mod reconciler;
pub mod record_view;
pub mod select;
pub mod sync;
pub mod text;


pub use bound::{BoundComponent, BoundOptions};
pub use collection_view::{CollectionView, CollectionViewOptions};
pub use control::{BoundInput, BoundLabel, BoundToggle, TextInput, Toggle, ValueControl};
pub use listener::{ChangeListener, UpdateFn};
pub use reconciler::{Factory, KeyedReconciler, ReconcilerOptions, RecordId};
pub use record_view::{RecordView, RecordViewOptions};
pub use select::{CollectionSelect, CollectionSelectOptions, OptionItem, SelectOption};
pub use sync::{SyncBarrier, SyncCallback};
pub use text::{BoundText, Label};

pub use repose_core::{
    Collection, CollectionEvent, Observable, ObservableList, ObservableRecord, Record,
    RecordChange, Transition,
};
