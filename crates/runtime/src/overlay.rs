use layers::{CircleLayerSpec, FilterState, LayerId, SourceSpec};
use tracing::info;

use crate::engine::{EngineError, MapEngine};

/// What `Overlay::ensure` had to (re)create.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Ensured {
    pub source_added: bool,
    pub layer_added: bool,
}

/// The pollution data source and its circle layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub source_id: String,
    pub source: SourceSpec,
    pub layer_id: LayerId,
    pub source_layer: String,
}

impl Overlay {
    pub fn layer_spec(&self, filter: &FilterState) -> CircleLayerSpec {
        CircleLayerSpec::pollution(
            self.layer_id.clone(),
            self.source_id.clone(),
            self.source_layer.clone(),
            filter.pollutant(),
        )
    }

    /// Adds the source, then the layer, skipping whichever already exists.
    pub fn ensure<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        filter: &FilterState,
    ) -> Result<Ensured, EngineError> {
        let mut out = Ensured::default();
        if !engine.has_source(&self.source_id) {
            engine.add_source(&self.source_id, &self.source)?;
            out.source_added = true;
        }
        if !engine.has_layer(&self.layer_id) {
            engine.add_layer(&self.layer_spec(filter))?;
            out.layer_added = true;
            info!(layer = %self.layer_id, "pollution layer added");
        }
        Ok(out)
    }
}
