//! Client-side workflow that registers a participant for an event.
//!
//! The [`form::RegistrationForm`] owns the draft and its errors; the field
//! policy ([`policy`], [`validate`]) decides what a given participant type
//! requires; [`suggest`] turns keystrokes into debounced autocomplete
//! lookups; [`submit`] runs the create → associate sequence, recovering from
//! duplicate-identity conflicts by searching for the existing record; and
//! [`errors`] maps collaborator failures onto a closed, localized error set.

pub mod draft;
pub mod errors;
pub mod form;
pub mod policy;
pub mod submit;
pub mod suggest;
pub mod testing;
pub mod validate;

pub use form::{FormSnapshot, RegistrationForm, SubmitResult};
