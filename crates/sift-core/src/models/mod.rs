pub mod clue;
pub mod entity;
pub mod event;
pub mod key;
pub mod search;

pub use clue::{
    Clue, ClueMetadata, ClueNode, ClueRelation, DisplayLevel, NodeAttributes, NodeKind, QueryRole,
    Stage,
};
pub use entity::{
    normalize_name, Entity, EntityCatalog, EntityTypeSpec, EntityValue, ValueConstraint,
};
pub use event::{EntityEventLink, Event, EventEntityAssociation, Section};
pub use key::{sort_keys, Key, KeySource, KeyStep};
pub use search::{RecallMode, RerankChannel, RerankStrategy, SearchRequest, SearchScope};
