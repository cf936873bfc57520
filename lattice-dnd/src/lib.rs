//! Lattice Drag and Drop
//!
//! This crate provides drag-and-drop session state for the Lattice UI
//! framework. It implements:
//!
//! - A shared drag context owning the one live drag engine per application
//! - Registries multiplexing predicates and event listeners contributed by
//!   independently mounted containers
//! - Hot reconfiguration that recreates the engine without losing listeners
//! - Identity-preserving reconciliation of container items after a drop
//!
//! The low-level drag engine (pointer tracking, mirror rendering) is an
//! external collaborator behind the [`engine::DragEngine`] trait. An
//! in-process [`engine::headless::HeadlessEngine`] implements it for tests
//! and pointer-free hosts.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `dom`: containers and item nodes, the rendered side of the model
//! - `registry`: container, predicate and event registries
//! - `engine`: the engine contract, its lifecycle lease and options
//! - `items`: keyed items, payload cargo and reconciliation
//! - `context`: the shared [`DndContext`]
//! - `binding`: per-container glue, [`ContainerBinding`]
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_dnd::engine::headless::HeadlessFactory;
//! use lattice_dnd::{BindingConfig, Container, ContainerBinding, DndContext};
//!
//! let factory = HeadlessFactory::new();
//! let ctx = DndContext::new(factory.clone());
//!
//! let todo = Container::new("todo").with_group("board").shared();
//! let done = Container::new("done").with_group("board").shared();
//!
//! let todo_binding = ContainerBinding::mount(
//!     &ctx,
//!     todo.clone(),
//!     BindingConfig::new()
//!         .items(records)
//!         .on_change(|items| println!("todo now holds {} items", items.len())),
//! );
//! let done_binding = ContainerBinding::mount(&ctx, done.clone(), BindingConfig::new());
//!
//! // Drag the first card from "todo" to "done"
//! let engine = factory.current().unwrap();
//! engine.drag_and_drop(&todo, &todo.children()[0], &done, 0)?;
//! ```

pub mod binding;
pub mod context;
pub mod dom;
pub mod engine;
pub mod error;
pub mod items;
pub mod registry;

pub use binding::{BindingConfig, ContainerBinding, ItemsCallback};
pub use context::DndContext;
pub use dom::{Axis, Container, ContainerId, ItemNode, NodeId};
pub use engine::{DragEvent, EngineOptions, EventKind, OptionsPatch, PlacementEvent};
pub use error::{DndError, Result};
pub use items::{Item, ItemKey, Record};
pub use registry::{ListenerId, OwnerId, SlotRegistration};
