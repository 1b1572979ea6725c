use std::collections::HashSet;
use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED};

use threatscore_core::error::{Error, Result};
use threatscore_core::types::{FieldType, IndexSchema, SCORE_FIELD};

/// Internal document id field; `bulk_index` replaces documents by this term.
pub const DOC_ID_FIELD: &str = "_id";

/// Translate a requested mapping into a tantivy schema.
///
/// Every integer field becomes an indexed, stored, fast `i64`; the `_id` field is always added.
pub fn build_schema(requested: &IndexSchema) -> Result<Schema> {
	if !requested.has_field(SCORE_FIELD, FieldType::Integer) {
		return Err(Error::InvalidConfig(format!("index schema must declare an integer '{}' field", SCORE_FIELD)));
	}
	let mut seen = HashSet::new();
	let mut schema_builder = Schema::builder();
	let _id_field = schema_builder.add_u64_field(DOC_ID_FIELD, INDEXED | STORED | FAST);
	for mapping in &requested.fields {
		if mapping.name == DOC_ID_FIELD {
			return Err(Error::InvalidConfig(format!("field name '{}' is reserved", DOC_ID_FIELD)));
		}
		if !seen.insert(mapping.name.as_str()) {
			return Err(Error::InvalidConfig(format!("field '{}' declared twice", mapping.name)));
		}
		match mapping.field_type {
			FieldType::Integer => { schema_builder.add_i64_field(&mapping.name, INDEXED | STORED | FAST); }
		}
	}
	Ok(schema_builder.build())
}

/// Resolve the `(_id, score)` field pair of an opened index.
pub fn score_fields(schema: &Schema) -> Result<(Field, Field)> {
	let id_field = schema.get_field(DOC_ID_FIELD).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
	let score_field = schema.get_field(SCORE_FIELD).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
	Ok((id_field, score_field))
}
