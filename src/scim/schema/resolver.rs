//! Resolution of parsed attribute paths against a resource type.

use super::{AttrId, ResourceType, SchemaRef};
use crate::scim::{
    filter::Filter,
    path::{AttributePath, PathSegment},
};

/// What an attribute path addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A whole extension schema, by index into [`ResourceType::extensions`]
    Extension(usize),
    Attribute(ResolvedAttribute),
}

/// A path resolved to its terminal attribute definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttribute {
    pub attribute: AttrId,
    /// The complex attribute holding `attribute`, if a sub-attribute is addressed
    pub parent: Option<AttrId>,
    /// Value filter selecting elements of the multivalued complex attribute
    pub filter: Option<Filter>,
}

impl ResolvedAttribute {
    /// The top-level attribute the path starts at.
    pub fn top_level(&self) -> AttrId {
        self.parent.unwrap_or(self.attribute)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Attribute '{0}' is unknown")]
    UnknownAttribute(String),

    #[error("Value filter in '{0}' is only allowed on multivalued complex attributes")]
    FilterNotAllowed(String),

    #[error("Attribute '{attribute}' in value filter is not a sub-attribute of '{parent}'")]
    UnknownFilterAttribute { attribute: String, parent: String },

    #[error("Attribute '{0}' has no sub-attributes")]
    NotComplex(String),
}

impl ResourceType {
    /// Resolve `path` against the main schema and then the extensions.
    ///
    /// A path without a schema URI whose first segment is not on the main
    /// schema is looked up on each extension schema in turn.
    pub fn resolve(&self, path: &AttributePath) -> Result<Resolved, ResolveError> {
        let Some(uri) = path.schema_uri.as_deref() else {
            if let Some(resolved) = self.resolve_in(SchemaRef::Main, &path.segments)? {
                return Ok(Resolved::Attribute(resolved));
            }
            for index in 0..self.extensions().len() {
                if let Some(resolved) =
                    self.resolve_in(SchemaRef::Extension(index), &path.segments)?
                {
                    return Ok(Resolved::Attribute(resolved));
                }
            }
            return Err(ResolveError::UnknownAttribute(format!(
                "{}:{}",
                self.main_schema().id,
                path.dotted_names()
            )));
        };

        // `urn:...:2.0:User` parses as URI `urn:...:2.0` plus attribute `User`
        if let [segment] = path.segments.as_slice()
            && segment.filter.is_none()
            && let Some(index) = self.extension_by_uri(&format!("{}:{}", uri, segment.name))
        {
            return Ok(Resolved::Extension(index));
        }

        let unknown = || ResolveError::UnknownAttribute(path.to_string());
        let (schema, _) = self.schema_by_uri(uri).ok_or_else(unknown)?;
        self.resolve_in(schema, &path.segments)?
            .map(Resolved::Attribute)
            .ok_or_else(unknown)
    }

    /// `Ok(None)` when the first segment is not an attribute of `schema`.
    fn resolve_in(
        &self,
        schema: SchemaRef,
        segments: &[PathSegment],
    ) -> Result<Option<ResolvedAttribute>, ResolveError> {
        let Some(first) = segments.first() else {
            return Ok(None);
        };
        let Some(top) = self.find_attribute(schema, &first.name) else {
            return Ok(None);
        };

        let filter = segments.iter().find_map(|s| s.filter.clone());
        if let Some(filter) = &filter {
            self.check_filter(top, filter)?;
        }

        let Some(second) = segments.get(1) else {
            return Ok(Some(ResolvedAttribute {
                attribute: top,
                parent: None,
                filter,
            }));
        };

        let top_attr = self.attribute(top);
        if !top_attr.is_complex() {
            return Err(ResolveError::NotComplex(top_attr.full_name.clone()));
        }
        let sub = self.find_sub_attribute(top, &second.name).ok_or_else(|| {
            ResolveError::UnknownAttribute(format!("{}.{}", top_attr.full_name, second.name))
        })?;

        Ok(Some(ResolvedAttribute {
            attribute: sub,
            parent: Some(top),
            filter,
        }))
    }

    fn check_filter(&self, target: AttrId, filter: &Filter) -> Result<(), ResolveError> {
        let attribute = self.attribute(target);
        if !attribute.is_multi_valued_complex() {
            return Err(ResolveError::FilterNotAllowed(attribute.full_name.clone()));
        }
        for name in filter.referenced_attributes() {
            if self.find_sub_attribute(target, name).is_none() {
                return Err(ResolveError::UnknownFilterAttribute {
                    attribute: name.to_string(),
                    parent: attribute.full_name.clone(),
                });
            }
        }
        Ok(())
    }
}
