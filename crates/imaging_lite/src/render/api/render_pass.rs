//! Render pass interface

use crate::render::api::{RenderPassState, RprimCollection};
use crate::render::index::RenderIndex;
use crate::render::RenderResult;

/// Backend object drawing one drawable collection into the bound buffers
pub trait RenderPass {
    /// Collection currently drawn
    fn collection(&self) -> &RprimCollection;

    /// Replace the drawn collection
    fn set_collection(&mut self, collection: RprimCollection);

    /// Pull backend-side state after the scene index has changed
    fn sync(&mut self) -> RenderResult<()> {
        Ok(())
    }

    /// Allocate per-frame resources for the tag-filtered drawables
    fn prepare(&mut self, _render_tags: &[String]) -> RenderResult<()> {
        Ok(())
    }

    /// Draw the collection through the pass state's camera into its bindings
    fn execute(
        &mut self,
        state: &RenderPassState,
        index: &RenderIndex,
        render_tags: &[String],
    ) -> RenderResult<()>;

    /// Whether further execution would no longer refine the image
    fn is_converged(&self) -> bool;
}
