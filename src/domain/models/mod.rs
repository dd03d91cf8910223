pub mod report;
pub mod update;
pub mod webhook;

pub use report::{HostFacts, Report};
pub use update::{RelaunchPlan, SkipReason, UpdateNotice, UpdateOutcome, UpdateState};
pub use webhook::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedThumbnail, WebhookMessage};
