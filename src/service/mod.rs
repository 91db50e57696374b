//! Application services (components H-L): ingest orchestration, session
//! logging, skill rendering, search/retrieve, and the top-level facade that
//! wires them to the transport layer.

pub mod facade;
pub mod resource_processor;
pub mod search;
pub mod session_service;
pub mod skill_processor;

pub use facade::{VikingService, VikingServiceBuilder};
pub use resource_processor::{ProcessResourceOutcome, ResourceProcessor};
pub use search::{FindResult, QueryPlan, ResultItem, SearchService, TypedQuery};
pub use session_service::{session_uri, CommitOutcome, SessionService};
pub use skill_processor::{
    parse_skill_document, render_skill_document, render_skill_markdown, skill_abstract, McpToolDefinition, SkillDocument,
    SkillFrontmatter,
};
