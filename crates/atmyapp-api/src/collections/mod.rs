//! Collection queries: filter DSL, parameter compilation, wire model and
//! response shaping.

mod filter;
mod params;
mod remote;
mod shape;
mod types;

pub use filter::{FilterExpr, FilterValue, Op, Primitive};
pub use params::{
    build_params, check_pagination, clamp_limit, clamp_offset, compile_filter,
    is_valid_field_name, normalize_order, normalize_select, parse_conditions, split_or_group,
    CompiledFilter, QueryParams, WireCondition, MAX_LIMIT, ORDERABLE_COLUMNS,
    SELECTABLE_COLUMNS,
};
pub use remote::{wire_params, DEFAULT_PLUGINS};
pub use shape::{shape_list, shape_single, ListResult, SingleResult};
pub use types::{
    EntriesPage, EntryId, Format, ListOptions, RawEntry, ResponseEnvelope, Select,
    DEFAULT_FAILURE_MESSAGE,
};
