use crate::api::Organization;
use crate::loader::TabCompletion;
use crate::reconcile::NormalizedResult;
use crate::ui::{DetailData, ResultSlotKind};
use uuid::Uuid;

/// Messages from background tasks to the main UI thread
pub enum BackgroundMessage {
    OrganizationsLoaded(Result<Vec<Organization>, String>),
    /// A detail tab fetch finished (possibly for an older context)
    DetailTab(TabCompletion<DetailData>),
    /// An analyzer request finished, already reconciled
    AnalysisFinished {
        panel: usize,
        slot: ResultSlotKind,
        request_id: Uuid,
        outcome: Result<NormalizedResult, String>,
    },
    /// A project or member mutation finished; `tab` is the detail tab it touched
    MutationFinished {
        organization_id: String,
        tab: usize,
        outcome: Result<String, String>,
    },
    OrganizationCreated(Result<Organization, String>),
    /// Carries the deleted organization's id
    OrganizationDeleted(Result<String, String>),
    /// Generic error (crashed task etc.)
    Error(String),
}
