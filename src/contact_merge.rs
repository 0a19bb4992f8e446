//! Contact merge reconciliation for HQ Public updates.
//!
//! HQ Public only accepts full contact records on `PUT`, so an update is
//! applied by fetching the current record and reconciling the caller's
//! sparse change into it:
//!
//! 1. Root-level copies of extra fields are removed from the fetched record.
//! 2. Update extra fields are written into the matching (`Key`) entry's
//!    `Values[0].Id` and `Values[0].Fields[0].Value` slots.
//! 3. Update addresses patch the matching (`AddressTypeId`) address, or are
//!    appended with every extra field expanded to the remote's nested shape.
//! 4. Remaining update fields overwrite root fields.
//!
//! Only the first entry with a given `Key` or `AddressTypeId` is ever
//! patched. Update extra fields with no matching `Key` are dropped.

use serde_json::{json, Map, Value};

use crate::errors::ApiError;
use crate::models::{
    AddressUpdate, Contact, ContactUpdate, ExtraFieldUpdate, ADDRESSES, ADDRESS_TYPE_ID,
    EXTRA_FIELDS, KEY,
};

/// Reconciles `update` into `existing` and returns the request body for PUT.
///
/// `existing` must be a record freshly fetched from HQ Public. Missing
/// `ExtraFields`/`Addresses` arrays are treated as empty; any other shape
/// mismatch fails with `ApiError::RemoteFailure`.
pub fn merge(existing: Contact, update: ContactUpdate) -> Result<Contact, ApiError> {
    let ContactUpdate {
        extra_fields,
        addresses,
        fields,
    } = update;
    let mut contact = existing.into_map();

    strip_root_duplicates(&mut contact);

    if !extra_fields.is_empty() {
        match contact.get_mut(EXTRA_FIELDS) {
            Some(Value::Array(existing_fields)) => {
                reconcile_extra_fields(existing_fields, &extra_fields, EXTRA_FIELDS)?;
            }
            Some(_) => return Err(malformed(EXTRA_FIELDS, "an array")),
            None => {
                for field in &extra_fields {
                    tracing::warn!(
                        "Contact has no ExtraFields; dropping update for key '{}'",
                        field.key
                    );
                }
            }
        }
    }

    if !addresses.is_empty() {
        merge_addresses(&mut contact, addresses)?;
    }

    for (key, value) in fields {
        if key == EXTRA_FIELDS || key == ADDRESSES {
            tracing::warn!("Ignoring raw '{}' in update root fields", key);
            continue;
        }
        contact.insert(key, value);
    }

    Ok(Contact::from_map(contact))
}

/// HQ Public mirrors some extra-field values onto the root object. Those
/// copies win over `ExtraFields` on PUT, so they must not be sent back.
fn strip_root_duplicates(contact: &mut Map<String, Value>) {
    let keys: Vec<String> = contact
        .get(EXTRA_FIELDS)
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| field.get(KEY).and_then(Value::as_str))
                .filter(|key| *key != EXTRA_FIELDS && *key != ADDRESSES)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    for key in keys {
        if contact.shift_remove(&key).is_some() {
            tracing::debug!("Removed root-level duplicate of extra field '{}'", key);
        }
    }
}

/// Applies each update to the first existing extra field with the same
/// `Key`. Returns how many updates found no match.
fn reconcile_extra_fields(
    existing: &mut [Value],
    updates: &[ExtraFieldUpdate],
    path: &str,
) -> Result<usize, ApiError> {
    let mut unmatched = 0;

    for update in updates {
        let position = existing
            .iter()
            .position(|field| field.get(KEY).and_then(Value::as_str) == Some(update.key.as_str()));

        match position {
            Some(index) => {
                let field_path = format!("{}[{}]", path, index);
                let field = existing[index]
                    .as_object_mut()
                    .ok_or_else(|| malformed(&field_path, "an object"))?;
                apply_extra_field(field, update, &field_path)?;
            }
            None => {
                tracing::warn!(
                    "No extra field '{}' in {}; update dropped",
                    update.key,
                    path
                );
                unmatched += 1;
            }
        }
    }

    Ok(unmatched)
}

fn apply_extra_field(
    field: &mut Map<String, Value>,
    update: &ExtraFieldUpdate,
    path: &str,
) -> Result<(), ApiError> {
    if update.id.is_none() && update.value.is_none() {
        return Ok(());
    }

    let values_path = format!("{}.Values[0]", path);
    let slot = first_object(field, "Values", &values_path)?;

    if let Some(id) = &update.id {
        slot.insert("Id".to_string(), id.clone());
    }

    if let Some(value) = &update.value {
        let fields_path = format!("{}.Fields[0]", values_path);
        let value_slot = first_object(slot, "Fields", &fields_path)?;
        value_slot.insert("Value".to_string(), value.clone());
    }

    Ok(())
}

/// Returns the first element of the array at `container[key]`, creating the
/// array and an empty first object when absent.
fn first_object<'a>(
    container: &'a mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a mut Map<String, Value>, ApiError> {
    let entry = container
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()));

    let array = entry
        .as_array_mut()
        .ok_or_else(|| malformed(path, "inside an array"))?;

    if array.is_empty() {
        array.push(Value::Object(Map::new()));
    }

    array[0]
        .as_object_mut()
        .ok_or_else(|| malformed(path, "an object"))
}

fn merge_addresses(
    contact: &mut Map<String, Value>,
    updates: Vec<AddressUpdate>,
) -> Result<(), ApiError> {
    let existing = match contact
        .entry(ADDRESSES)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(addresses) => addresses,
        _ => return Err(malformed(ADDRESSES, "an array")),
    };

    let mut appended = Vec::new();

    for update in updates {
        let position = update.address_type_id().and_then(|type_id| {
            existing
                .iter()
                .position(|address| address.get(ADDRESS_TYPE_ID) == Some(type_id))
        });

        match position {
            Some(index) => {
                let path = format!("{}[{}]", ADDRESSES, index);
                let address = existing[index]
                    .as_object_mut()
                    .ok_or_else(|| malformed(&path, "an object"))?;
                patch_address(address, update, &path)?;
            }
            None => appended.push(new_address(update)),
        }
    }

    if !appended.is_empty() {
        tracing::debug!("Appending {} new address(es) to contact", appended.len());
    }
    existing.extend(appended);

    Ok(())
}

fn patch_address(
    address: &mut Map<String, Value>,
    update: AddressUpdate,
    path: &str,
) -> Result<(), ApiError> {
    let AddressUpdate {
        extra_fields,
        fields,
    } = update;

    if !extra_fields.is_empty() {
        let fields_path = format!("{}.{}", path, EXTRA_FIELDS);
        match address.get_mut(EXTRA_FIELDS) {
            Some(Value::Array(existing_fields)) => {
                reconcile_extra_fields(existing_fields, &extra_fields, &fields_path)?;
            }
            Some(_) => return Err(malformed(&fields_path, "an array")),
            None => {
                tracing::warn!(
                    "{} has no ExtraFields; dropping {} update(s)",
                    path,
                    extra_fields.len()
                );
            }
        }
    }

    for (key, value) in fields {
        if key == EXTRA_FIELDS {
            continue;
        }
        address.insert(key, value);
    }

    Ok(())
}

/// Builds an address that HQ Public has not seen yet, with the synthesized
/// `ExtraFields` array first and the caller's fields after it.
fn new_address(update: AddressUpdate) -> Value {
    let AddressUpdate {
        extra_fields,
        fields,
    } = update;

    let mut address = Map::new();
    address.insert(
        EXTRA_FIELDS.to_string(),
        Value::Array(extra_fields.iter().map(synthesize_extra_field).collect()),
    );

    for (key, value) in fields {
        if key == EXTRA_FIELDS {
            continue;
        }
        address.insert(key, value);
    }

    Value::Object(address)
}

/// Expands `{Key, Id?, Value?}` into the full nested extra-field shape.
pub fn synthesize_extra_field(update: &ExtraFieldUpdate) -> Value {
    json!({
        "Key": update.key,
        "DomainSchemaFieldType": 0,
        "Options": [],
        "Values": [
            {
                "Id": update.id.clone().unwrap_or(Value::Null),
                "Fields": [
                    { "Value": update.value.clone().unwrap_or(Value::Null) }
                ]
            }
        ]
    })
}

fn malformed(path: &str, expected: &str) -> ApiError {
    ApiError::RemoteFailure(format!("Malformed contact: {} is not {}", path, expected))
}
