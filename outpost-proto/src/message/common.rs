//! Conversions for the GraphQL metadata shared by several operations.

use std::collections::HashMap;

use outpost_driver::types::{
    Directive, FragmentDefinition, OperationDefinition, ResponsePath, Selection, TypeRef,
    VariableDefinition,
};
use outpost_driver::{Function, ResolveInfo};

use crate::ProtoError;
use crate::driver as proto;
use crate::value::{Variables, decode, decode_map, encode, encode_map};

pub(crate) fn encode_function(function: &Function) -> proto::Function {
    proto::Function {
        name: function.name.clone(),
    }
}

pub(crate) fn decode_function(function: Option<proto::Function>) -> Function {
    Function {
        name: function.map(|f| f.name).unwrap_or_default(),
    }
}

pub fn encode_type_ref(type_ref: &TypeRef) -> proto::TypeRef {
    match type_ref {
        TypeRef::Named(name) => proto::TypeRef {
            name: name.clone(),
            ..Default::default()
        },
        TypeRef::NonNull(inner) => proto::TypeRef {
            non_null: Some(Box::new(encode_type_ref(inner))),
            ..Default::default()
        },
        TypeRef::List(inner) => proto::TypeRef {
            list: Some(Box::new(encode_type_ref(inner))),
            ..Default::default()
        },
    }
}

/// Decodes a wire type reference; an empty message decodes to nothing.
pub fn decode_type_ref(type_ref: &proto::TypeRef) -> Option<TypeRef> {
    if let Some(inner) = &type_ref.non_null {
        return decode_type_ref(inner).map(|t| TypeRef::NonNull(Box::new(t)));
    }
    if let Some(inner) = &type_ref.list {
        return decode_type_ref(inner).map(|t| TypeRef::List(Box::new(t)));
    }
    if type_ref.name.is_empty() {
        None
    } else {
        Some(TypeRef::Named(type_ref.name.clone()))
    }
}

fn encode_response_path(path: &ResponsePath) -> proto::ResponsePath {
    proto::ResponsePath {
        key: Some(encode(&path.key)),
        prev: path
            .prev
            .as_ref()
            .map(|prev| Box::new(encode_response_path(prev))),
    }
}

fn decode_response_path(
    path: &proto::ResponsePath,
    variables: &Variables,
) -> Result<ResponsePath, ProtoError> {
    Ok(ResponsePath {
        key: path
            .key
            .as_ref()
            .map(|key| decode(key, variables))
            .transpose()?
            .unwrap_or_default(),
        prev: path
            .prev
            .as_ref()
            .map(|prev| decode_response_path(prev, variables).map(Box::new))
            .transpose()?,
    })
}

fn encode_directives(directives: &[Directive]) -> Vec<proto::Directive> {
    directives
        .iter()
        .map(|directive| proto::Directive {
            name: directive.name.clone(),
            arguments: encode_map(&directive.arguments),
        })
        .collect()
}

fn decode_directives(
    directives: &[proto::Directive],
    variables: &Variables,
) -> Result<Vec<Directive>, ProtoError> {
    directives
        .iter()
        .map(|directive| {
            Ok(Directive {
                name: directive.name.clone(),
                arguments: decode_map(&directive.arguments, variables)?,
            })
        })
        .collect()
}

fn encode_variable_definitions(
    definitions: &[VariableDefinition],
) -> Vec<proto::VariableDefinition> {
    definitions
        .iter()
        .map(|definition| proto::VariableDefinition {
            variable: Some(proto::Variable {
                name: definition.variable.clone(),
            }),
            default_value: definition.default_value.as_ref().map(encode),
        })
        .collect()
}

fn decode_variable_definitions(
    definitions: &[proto::VariableDefinition],
    variables: &Variables,
) -> Result<Vec<VariableDefinition>, ProtoError> {
    definitions
        .iter()
        .map(|definition| {
            Ok(VariableDefinition {
                variable: definition
                    .variable
                    .as_ref()
                    .map(|v| v.name.clone())
                    .unwrap_or_default(),
                default_value: definition
                    .default_value
                    .as_ref()
                    .map(|value| decode(value, variables))
                    .transpose()?,
            })
        })
        .collect()
}

fn encode_selections(selections: &[Selection]) -> Vec<proto::Selection> {
    selections
        .iter()
        .map(|selection| match selection {
            Selection::Field {
                name,
                arguments,
                directives,
                selection_set,
            } => proto::Selection {
                name: name.clone(),
                arguments: encode_map(arguments),
                directives: encode_directives(directives),
                selection_set: encode_selections(selection_set),
                definition: None,
            },
            Selection::Fragment(definition) => proto::Selection {
                definition: Some(encode_fragment_definition(definition)),
                ..Default::default()
            },
        })
        .collect()
}

fn decode_selections(
    selections: &[proto::Selection],
    variables: &Variables,
) -> Result<Vec<Selection>, ProtoError> {
    selections
        .iter()
        .map(|selection| {
            if let Some(definition) = &selection.definition {
                return Ok(Selection::Fragment(decode_fragment_definition(
                    definition, variables,
                )?));
            }
            Ok(Selection::Field {
                name: selection.name.clone(),
                arguments: decode_map(&selection.arguments, variables)?,
                directives: decode_directives(&selection.directives, variables)?,
                selection_set: decode_selections(&selection.selection_set, variables)?,
            })
        })
        .collect()
}

fn encode_fragment_definition(definition: &FragmentDefinition) -> proto::FragmentDefinition {
    proto::FragmentDefinition {
        directives: encode_directives(&definition.directives),
        type_condition: definition.type_condition.as_ref().map(encode_type_ref),
        selection_set: encode_selections(&definition.selection_set),
        variable_definitions: encode_variable_definitions(&definition.variable_definitions),
        name: definition.name.clone(),
    }
}

fn decode_fragment_definition(
    definition: &proto::FragmentDefinition,
    variables: &Variables,
) -> Result<FragmentDefinition, ProtoError> {
    Ok(FragmentDefinition {
        name: definition.name.clone(),
        type_condition: definition.type_condition.as_ref().and_then(decode_type_ref),
        directives: decode_directives(&definition.directives, variables)?,
        variable_definitions: decode_variable_definitions(
            &definition.variable_definitions,
            variables,
        )?,
        selection_set: decode_selections(&definition.selection_set, variables)?,
    })
}

pub fn encode_operation_definition(
    operation: &OperationDefinition,
) -> proto::OperationDefinition {
    proto::OperationDefinition {
        directives: encode_directives(&operation.directives),
        name: operation.name.clone().unwrap_or_default(),
        operation: operation.operation.clone(),
        selection_set: encode_selections(&operation.selection_set),
        variable_definitions: encode_variable_definitions(&operation.variable_definitions),
    }
}

pub fn decode_operation_definition(
    operation: &proto::OperationDefinition,
    variables: &Variables,
) -> Result<OperationDefinition, ProtoError> {
    Ok(OperationDefinition {
        operation: operation.operation.clone(),
        name: (!operation.name.is_empty()).then(|| operation.name.clone()),
        directives: decode_directives(&operation.directives, variables)?,
        variable_definitions: decode_variable_definitions(
            &operation.variable_definitions,
            variables,
        )?,
        selection_set: decode_selections(&operation.selection_set, variables)?,
    })
}

pub fn encode_resolve_info(info: &ResolveInfo) -> proto::ResolveInfo {
    proto::ResolveInfo {
        field_name: info.field_name.clone(),
        path: info.path.as_ref().map(encode_response_path),
        return_type: info.return_type.as_ref().map(encode_type_ref),
        parent_type: info.parent_type.as_ref().map(encode_type_ref),
        operation: info.operation.as_ref().map(encode_operation_definition),
        variable_values: encode_map(&info.variable_values),
    }
}

/// Rebuilds the host-side info from the wire, resolving every embedded
/// literal against the request's effective variable map. The returned
/// `variable_values` is the merged (defaults + request) map, decoded.
pub fn decode_resolve_info(
    info: Option<&proto::ResolveInfo>,
    variables: &Variables,
) -> Result<ResolveInfo, ProtoError> {
    let Some(info) = info else {
        return Ok(ResolveInfo::default());
    };
    Ok(ResolveInfo {
        field_name: info.field_name.clone(),
        path: info
            .path
            .as_ref()
            .map(|path| decode_response_path(path, variables))
            .transpose()?,
        return_type: info.return_type.as_ref().and_then(decode_type_ref),
        parent_type: info.parent_type.as_ref().and_then(decode_type_ref),
        operation: info
            .operation
            .as_ref()
            .map(|operation| decode_operation_definition(operation, variables))
            .transpose()?,
        variable_values: decode_map(variables, variables)?,
    })
}

/// The effective variable map carried by a request's info block.
pub(crate) fn info_variables(info: Option<&proto::ResolveInfo>) -> Variables {
    let Some(info) = info else {
        return Variables::new();
    };
    crate::value::variables(info.operation.as_ref(), &info.variable_values)
}

pub(crate) fn decode_plain_variable_values(
    values: &HashMap<String, proto::Value>,
) -> Result<std::collections::BTreeMap<String, outpost_driver::Value>, ProtoError> {
    decode_map(values, &Variables::new())
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;
    use outpost_driver::Value as HostValue;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn type_refs_round_trip() {
        let t = TypeRef::named("Droid").non_null().list();
        assert_eq!(decode_type_ref(&encode_type_ref(&t)), Some(t));
        assert_eq!(decode_type_ref(&proto::TypeRef::default()), None);
    }

    #[test]
    fn response_paths_round_trip_inner_first() {
        let path = ResponsePath::new("hero").child(0i64).child("name");
        let decoded =
            decode_response_path(&encode_response_path(&path), &Variables::new()).unwrap();
        assert_eq!(decoded, path);
    }

    #[test]
    fn operations_round_trip_with_expanded_fragments() {
        let operation = OperationDefinition {
            operation: "query".to_string(),
            name: Some("HeroQuery".to_string()),
            directives: vec![Directive {
                name: "cached".to_string(),
                arguments: btreemap! {
                    "ttl".to_string() => HostValue::Int(60),
                },
            }],
            variable_definitions: vec![VariableDefinition {
                variable: "episode".to_string(),
                default_value: Some(HostValue::from("JEDI")),
            }],
            selection_set: vec![Selection::Field {
                name: "hero".to_string(),
                arguments: btreemap! {
                    "episode".to_string() => HostValue::Variable("episode".to_string()),
                },
                directives: vec![],
                selection_set: vec![Selection::Fragment(FragmentDefinition {
                    name: "heroFields".to_string(),
                    type_condition: Some(TypeRef::named("Character")),
                    directives: vec![],
                    variable_definitions: vec![],
                    selection_set: vec![Selection::Field {
                        name: "name".to_string(),
                        arguments: Default::default(),
                        directives: vec![],
                        selection_set: vec![],
                    }],
                })],
            }],
        };

        let wire = encode_operation_definition(&operation);
        let merged = crate::value::variables(Some(&wire), &Variables::new());
        let decoded = decode_operation_definition(&wire, &merged).unwrap();

        // Decoding substitutes variable placeholders from the effective map;
        // everything else survives unchanged.
        let mut expected = operation;
        expected.selection_set = vec![match expected.selection_set.remove(0) {
            Selection::Field {
                name,
                directives,
                selection_set,
                ..
            } => Selection::Field {
                name,
                arguments: btreemap! {
                    "episode".to_string() => HostValue::from("JEDI"),
                },
                directives,
                selection_set,
            },
            fragment => fragment,
        }];
        assert_eq!(decoded, expected);
    }
}
