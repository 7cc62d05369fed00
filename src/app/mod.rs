pub mod background;
pub mod input;
pub mod messages;
pub mod runtime;

pub use messages::BackgroundMessage;
pub use runtime::run_tui;

use crate::api::ApiClient;
use crate::loader::TabLoader;
use crate::ui::DetailData;
use std::sync::mpsc;

pub struct RuntimeContext<'a> {
    pub client: &'a ApiClient,
    pub tx: &'a mpsc::Sender<messages::BackgroundMessage>,
}

/// Loader for the organization detail tabs, in `PROJECTS_TAB`,
/// `MEMBERS_TAB`, `USAGE_TAB` order.
pub fn detail_loader(
    client: &ApiClient,
    organization_id: &str,
    max_age: Option<chrono::Duration>,
) -> TabLoader<DetailData> {
    let projects = client.clone();
    let members = client.clone();
    let usage = client.clone();

    let loader = TabLoader::new(organization_id)
        .with_tab("Projects", move |org: &str| {
            let client = projects.clone();
            let org = org.to_string();
            async move {
                client
                    .list_projects(&org)
                    .await
                    .map(DetailData::Projects)
                    .map_err(|e| e.user_message())
            }
        })
        .with_tab("Members", move |org: &str| {
            let client = members.clone();
            let org = org.to_string();
            async move {
                client
                    .list_members(&org)
                    .await
                    .map(DetailData::Members)
                    .map_err(|e| e.user_message())
            }
        })
        .with_tab("Usage", move |org: &str| {
            let client = usage.clone();
            let org = org.to_string();
            async move {
                client
                    .usage(&org)
                    .await
                    .map(DetailData::Usage)
                    .map_err(|e| e.user_message())
            }
        });

    match max_age {
        Some(age) => loader.with_max_age(age),
        None => loader,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{MEMBERS_TAB, PROJECTS_TAB, USAGE_TAB};
    use std::time::Duration;

    #[test]
    fn test_detail_loader_tab_order() {
        let client = ApiClient::new("http://localhost:9", None, Duration::from_secs(1)).unwrap();
        let loader = detail_loader(&client, "org-1", None);
        let labels = loader.labels();
        assert_eq!(labels[PROJECTS_TAB], "Projects");
        assert_eq!(labels[MEMBERS_TAB], "Members");
        assert_eq!(labels[USAGE_TAB], "Usage");
        assert_eq!(loader.context_id(), "org-1");
    }
}
