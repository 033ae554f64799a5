//! Member names shared between emitted types and the guest language.

use std::borrow::Cow;

use vesta_object::HostMethod;

/// Prefix of the helpers that call a base implementation non-virtually.
pub const BASE_METHOD_PREFIX: &str = "#base#";
pub const FIELD_GETTER_PREFIX: &str = "#field_get#";
pub const FIELD_SETTER_PREFIX: &str = "#field_set#";

/// Field holding the guest class of an instance.
pub const CLASS_FIELD: &str = "#class";
/// Field holding the guest instance data, created on demand.
pub const INSTANCE_DATA_FIELD: &str = "#instance_data";

/// Name of the default indexer property.
const INDEXER: &str = "Item";

/// The guest-visible name of a host method: accessors lose their prefix,
/// setters gain a trailing `=`, and the indexer becomes `[]` / `[]=`.
pub fn guest_name(method: &HostMethod) -> Cow<'_, str> {
    let name = method.name();
    if !method.is_special_name() {
        return Cow::Borrowed(name);
    }
    if let Some(property) = name.strip_prefix("get_") {
        if property == INDEXER {
            return Cow::Borrowed("[]");
        }
        return Cow::Borrowed(property);
    }
    if let Some(property) = name.strip_prefix("set_") {
        if property == INDEXER {
            return Cow::Borrowed("[]=");
        }
        return Cow::Owned(format!("{property}="));
    }
    Cow::Borrowed(name)
}
