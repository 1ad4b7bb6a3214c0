//! Binary metadata.
//!
//! A binary is a built artifact (a `.deb`, `.rpm`, ...) belonging to
//! a project and built for a specific distro, distro version and
//! architecture.

use crate::api::v1::binary::BinaryFields;
use crate::error::{ChacraError, ChacraResult};

/// Maximum length of any textual binary field.
pub const MAX_FIELD_LEN: usize = 256;

/// The client-settable attributes of a binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryAttrs {
    /// Location of the artifact on disk.
    ///
    /// `None` means the path has never been set. See [`ArtifactPath`].
    pub path: Option<String>,

    pub distro: String,

    pub distro_version: String,

    pub arch: String,

    pub git_ref: Option<String>,

    pub built_by: Option<String>,

    pub size: i64,
}

/// The state of a binary's path, as seen by checksum derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPath<'a> {
    /// No path was ever assigned.
    Unset,

    /// A path was assigned but it is empty.
    Empty,

    /// A usable path.
    Path(&'a str),
}

impl BinaryAttrs {
    /// Builds attributes from a client payload.
    ///
    /// Missing required fields are left empty and rejected by
    /// [`BinaryAttrs::validate`].
    pub fn from_fields(fields: BinaryFields) -> Self {
        let mut attrs = Self::default();
        attrs.apply(fields);
        attrs
    }

    /// Merges the fields present in `fields`, leaving the others untouched.
    pub fn apply(&mut self, fields: BinaryFields) {
        let BinaryFields {
            path,
            distro,
            distro_version,
            arch,
            git_ref,
            built_by,
            size,
        } = fields;

        if let Some(path) = path {
            self.path = Some(path);
        }
        if let Some(distro) = distro {
            self.distro = distro;
        }
        if let Some(distro_version) = distro_version {
            self.distro_version = distro_version;
        }
        if let Some(arch) = arch {
            self.arch = arch;
        }
        if let Some(git_ref) = git_ref {
            self.git_ref = Some(git_ref);
        }
        if let Some(built_by) = built_by {
            self.built_by = Some(built_by);
        }
        if let Some(size) = size {
            self.size = size;
        }
    }

    /// Returns the state of the artifact path.
    pub fn artifact_path(&self) -> ArtifactPath<'_> {
        match self.path.as_deref() {
            None => ArtifactPath::Unset,
            Some("") => ArtifactPath::Empty,
            Some(path) => ArtifactPath::Path(path),
        }
    }

    /// Returns the ref this binary is grouped under.
    ///
    /// An empty ref is the same as no ref.
    pub fn grouping_ref(&self) -> Option<&str> {
        self.git_ref.as_deref().filter(|r| !r.is_empty())
    }

    /// Checks the attributes together with the binary name.
    pub fn validate(&self, name: &str) -> ChacraResult<()> {
        validate_required("name", name)?;
        validate_required("distro", &self.distro)?;
        validate_required("distro_version", &self.distro_version)?;
        validate_required("arch", &self.arch)?;

        validate_optional("path", self.path.as_deref())?;
        validate_optional("ref", self.git_ref.as_deref())?;
        validate_optional("built_by", self.built_by.as_deref())?;

        if self.size < 0 {
            return Err(ChacraError::InvalidBinaryField {
                field: "size",
                reason: "Size cannot be negative",
            });
        }

        Ok(())
    }
}

fn validate_required(field: &'static str, value: &str) -> ChacraResult<()> {
    if value.is_empty() {
        return Err(ChacraError::InvalidBinaryField {
            field,
            reason: "Field is required",
        });
    }

    validate_optional(field, Some(value))
}

fn validate_optional(field: &'static str, value: Option<&str>) -> ChacraResult<()> {
    match value {
        Some(v) if v.chars().count() > MAX_FIELD_LEN => Err(ChacraError::InvalidBinaryField {
            field,
            reason: "Field is longer than 256 characters",
        }),
        _ => Ok(()),
    }
}
