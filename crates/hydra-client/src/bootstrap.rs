//! Client bootstrap: read the payloads, restore the caches, then hydrate
//! or cold-start.

use std::sync::Arc;

use hydra_core::DataCache;
use hydra_data::prefetch;
use hydra_render::{Application, ChunkRecord, Navigation, RenderError, RouteStatus, StyleRecord};
use hydra_snapshot::{
    deserialize, parse_chunk_ids, parse_style_ids, SsrFlag, CHUNK_SCRIPT_ID, DATA_SCRIPT_ID,
    FLAG_SCRIPT_ID, STYLE_SCRIPT_ID,
};
use tracing::{debug, info, warn};

use crate::dom::Dom;
use crate::runtime::ClientRuntime;

/// How the client took over the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    /// Server markup reused against restored state.
    Hydrate,
    /// Root rendered from scratch.
    ColdStart,
}

/// Why the client did not hydrate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColdStartReason {
    #[error("flag payload missing or unrecognized")]
    FlagAbsent,

    #[error("document was not server-rendered")]
    NotServerRendered,

    #[error("data payload unreadable: {0}")]
    DataUnreadable(String),

    #[error("root element '{0}' not found")]
    RootMissing(String),
}

/// Payloads read from the document.
#[derive(Debug)]
pub struct BootPayloads {
    /// Valid flag of the current schema, if any.
    pub flag: Option<SsrFlag>,
    /// Restored data cache, or why it could not be restored.
    pub data: Result<DataCache, String>,
    /// Style ids already present in the document.
    pub styles: StyleRecord,
    /// Chunks the server render used.
    pub chunks: ChunkRecord,
}

impl BootPayloads {
    /// Read every payload. Missing or malformed payloads never fail the
    /// read; they surface as absent values.
    pub fn read(dom: &impl Dom) -> Self {
        let flag = dom.script_text(FLAG_SCRIPT_ID).and_then(|text| SsrFlag::parse(&text));

        let data = match dom.script_text(DATA_SCRIPT_ID) {
            Some(text) => deserialize(&text).map_err(|e| e.to_string()),
            None => Err("data payload missing".to_string()),
        };

        let styles = dom
            .script_text(STYLE_SCRIPT_ID)
            .and_then(|text| parse_style_ids(&text).ok())
            .unwrap_or_default();

        let chunks = dom
            .script_text(CHUNK_SCRIPT_ID)
            .and_then(|text| parse_chunk_ids(&text).ok())
            .unwrap_or_default();

        Self {
            flag,
            data,
            styles,
            chunks,
        }
    }

    /// Hydrate only for a server-rendered flag with a readable data payload.
    pub fn decide(&self) -> Result<(), ColdStartReason> {
        match self.flag {
            None => Err(ColdStartReason::FlagAbsent),
            Some(flag) if !flag.is_ssr => Err(ColdStartReason::NotServerRendered),
            Some(_) => match &self.data {
                Ok(_) => Ok(()),
                Err(e) => Err(ColdStartReason::DataUnreadable(e.clone())),
            },
        }
    }
}

/// Result of booting the client.
#[derive(Debug, Clone)]
pub struct BootOutcome {
    pub mode: BootMode,
    /// Set when `mode` is `ColdStart`.
    pub reason: Option<ColdStartReason>,
    /// Hydration found markup different from the server's and patched it.
    pub mismatch: bool,
    /// Loader invocations made during boot.
    pub loader_calls: usize,
    pub status: RouteStatus,
    /// Style rules the client had to insert.
    pub inserted_styles: usize,
    /// Chunks the client render needed beyond the server's.
    pub extra_chunks: Vec<String>,
    /// Navigation a component requested during boot.
    pub navigation: Option<String>,
}

/// Boots an application against a server-rendered (or bare) document.
pub struct Bootstrap {
    app: Arc<Application>,
    root_id: String,
}

impl Bootstrap {
    /// Create a bootstrap for an application.
    pub fn new(app: Arc<Application>) -> Self {
        Self {
            app,
            root_id: "root".to_string(),
        }
    }

    /// Set the root mount element id.
    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }

    /// Take over the document at `location`.
    ///
    /// Restored entries satisfy prefetch, so a hydrating client makes no
    /// loader call for state the server snapshotted. Any payload problem
    /// means cold-start: the caches start empty (or from whatever data the
    /// document still carries) and the root is rendered fresh.
    pub async fn start<D: Dom>(&self, dom: &mut D, location: &str) -> (ClientRuntime, BootOutcome) {
        let payloads = BootPayloads::read(&*dom);

        let mut decision = payloads.decide();
        if decision.is_ok() && dom.root_html(&self.root_id).is_none() {
            decision = Err(ColdStartReason::RootMissing(self.root_id.clone()));
        }

        let BootPayloads {
            flag,
            data,
            styles,
            chunks,
        } = payloads;
        // Data is trusted only from a document carrying a recognized flag.
        let mut cache = match (flag, data) {
            (Some(_), Ok(cache)) => cache,
            (None, _) => DataCache::new(),
            (Some(_), Err(e)) => {
                warn!(error = %e, "Data payload unusable, starting with an empty cache");
                DataCache::new()
            }
        };

        let mut runtime = ClientRuntime::new(
            self.app.clone(),
            self.root_id.clone(),
            styles.ids().iter().cloned(),
            chunks.ids().iter().cloned(),
        );

        let (tree, matches, status) = match self.app.resolve(location) {
            Ok(resolution) => (Some(resolution.tree), resolution.matches, resolution.status),
            Err(e) => {
                warn!(error = %e, location, "Client could not resolve location");
                (None, Vec::new(), RouteStatus::NotFound)
            }
        };

        let report = prefetch(&matches, &mut cache).await;
        let result = match &tree {
            Some(tree) => runtime.engine().render(tree, &cache, None),
            None => runtime
                .engine()
                .fallback(RenderError::UnknownComponent(location.to_string()), &cache),
        };

        let (mode, reason, mismatch) = match decision {
            Ok(()) => {
                let server = dom.root_html(&self.root_id).unwrap_or_default();
                if server == result.markup {
                    debug!("Hydrated without changes");
                    (BootMode::Hydrate, None, false)
                } else {
                    warn!(
                        server_len = server.len(),
                        client_len = result.markup.len(),
                        "Hydration mismatch, patching root"
                    );
                    dom.set_root_html(&self.root_id, &result.markup);
                    (BootMode::Hydrate, None, true)
                }
            }
            Err(reason) => {
                info!(reason = %reason, "Cold-starting client render");
                dom.set_root_html(&self.root_id, &result.markup);
                (BootMode::ColdStart, Some(reason), false)
            }
        };

        let inserted_styles = result.styles.get_record().len();
        let extra_chunks = runtime.absorb(dom, &result);
        runtime.settle(location, cache);

        let outcome = BootOutcome {
            mode,
            reason,
            mismatch,
            loader_calls: report.loader_calls(),
            status,
            inserted_styles,
            extra_chunks,
            navigation: match result.navigation {
                Some(Navigation::Navigate(path)) | Some(Navigation::Redirect(path)) => Some(path),
                None => None,
            },
        };
        (runtime, outcome)
    }
}
