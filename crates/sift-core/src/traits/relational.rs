use crate::errors::SiftResult;
use crate::models::{Entity, EntityEventLink, Event, SearchScope, Section};

/// Entity, event, association, and section records.
pub trait IRelationalStore: Send + Sync {
    fn entities_by_ids(&self, ids: &[String]) -> SiftResult<Vec<Entity>>;

    /// Entities whose normalized name equals one of `names` (already normalized).
    fn entities_by_normalized_names(
        &self,
        names: &[String],
        scope: &SearchScope,
    ) -> SiftResult<Vec<Entity>>;

    /// All association rows touching any of the given entities.
    fn associations_for_entities(&self, entity_ids: &[String]) -> SiftResult<Vec<EntityEventLink>>;

    /// All association rows touching any of the given events.
    fn associations_for_events(&self, event_ids: &[String]) -> SiftResult<Vec<EntityEventLink>>;

    /// Events with their associations eagerly loaded.
    fn events_by_ids(&self, ids: &[String]) -> SiftResult<Vec<Event>>;

    fn sections_by_ids(&self, ids: &[String]) -> SiftResult<Vec<Section>>;
}
