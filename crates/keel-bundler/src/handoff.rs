//! Render-handler handoff.
//!
//! The render handler is an external collaborator: the pipeline only hands
//! it module references, a flag for which request variant is being served,
//! and — for full renders — the chunk-group handle of the page's client
//! bundle. Both variants come out of one shared pipeline as a tagged
//! configuration, not two code paths.

use keel_graph::ModuleRef;

use crate::emit::ChunkGroupHandle;

/// Which request variant a handoff serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderVariant {
    /// Data request: props only, no client bundle is shipped.
    DataRequest,
    /// Full render: the page hydrates from its chunk group.
    Render,
}

impl RenderVariant {
    pub fn is_data_req(self) -> bool {
        matches!(self, Self::DataRequest)
    }
}

/// The record the external render handler is invoked with.
#[derive(Debug, Clone)]
pub struct PageHandoff {
    pub is_data_req: bool,
    pub app: ModuleRef,
    pub document: ModuleRef,
    /// Elided for data requests; the handler substitutes a no-op component.
    pub component: Option<ModuleRef>,
    pub not_found: ModuleRef,
    /// Whether the page ships its own not-found module. Computed by identity
    /// comparison: the generic error module is an external and carries no
    /// id, so comparing assigned ids is not possible.
    pub has_custom_not_found: bool,
    /// Only the render variant carries the chunk group.
    pub chunk_group: Option<ChunkGroupHandle>,
}

impl PageHandoff {
    /// Assemble a handoff for one request variant.
    ///
    /// `chunk_group` is dropped for data requests even when supplied: the
    /// data variant of a page never ships a client bundle.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        variant: RenderVariant,
        app: ModuleRef,
        document: ModuleRef,
        component: ModuleRef,
        not_found: ModuleRef,
        error: &ModuleRef,
        chunk_group: Option<ChunkGroupHandle>,
    ) -> Self {
        let has_custom_not_found = !not_found.identity_eq(error);
        let is_data_req = variant.is_data_req();
        Self {
            is_data_req,
            app,
            document,
            component: (!is_data_req).then_some(component),
            not_found,
            has_custom_not_found,
            chunk_group: if is_data_req { None } else { chunk_group },
        }
    }
}
