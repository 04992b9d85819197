//! Domain services over the versioned-entity engine.
//!
//! Each service instantiates the generic engine with its content shape and
//! adds the domain's pre-deploy validation:
//! - `prompt` - template/script prompt configurations
//! - `trigger` - schedule/webhook trigger configurations, including the
//!   cross-entity rule that a referenced prompt must belong to the same
//!   agent as the trigger

pub mod prompt;
pub mod trigger;

pub use prompt::{PromptContent, PromptKind, PromptMode, PromptPatch, PromptService};
pub use trigger::{
    TriggerContent, TriggerKind, TriggerMode, TriggerPatch, TriggerService, TriggerType,
};
