use crate::ValidationError;

use super::document::VariableDefinition;

/// Variable values keyed by variable name (without the leading `$`).
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// A variable type as declared in an operation header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeRef
{
	Named(String),
	List(Box<TypeRef>),
	NonNull(Box<TypeRef>),
}

impl std::fmt::Display for TypeRef
{
	fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		match self
		{
			Self::Named(name) => write!(formatter, "{name}"),
			Self::List(item_type) => write!(formatter, "[{item_type}]"),
			Self::NonNull(inner_type) => write!(formatter, "{inner_type}!"),
		}
	}
}

impl From<&graphql_parser::query::Type<'_, String>> for TypeRef
{
	fn from(declared_type: &graphql_parser::query::Type<'_, String>) -> Self
	{
		use graphql_parser::query::Type;

		match declared_type
		{
			Type::NamedType(name) => Self::Named(name.clone()),
			Type::ListType(item_type) => Self::List(Box::new(Self::from(item_type.as_ref()))),
			Type::NonNullType(inner_type) => Self::NonNull(Box::new(Self::from(inner_type.as_ref()))),
		}
	}
}

/// Serialize caller-provided variables into a variable map.
///
/// Anything that serializes to a JSON object is accepted, and `()` or `None` stand for “no
/// variables”.
pub fn to_variables<V>(variables: &V) -> Result<Variables, ValidationError>
where
	V: serde::Serialize + ?Sized,
{
	match serde_json::to_value(variables).map_err(ValidationError::SerializeVariables)?
	{
		serde_json::Value::Object(variables) => Ok(variables),
		serde_json::Value::Null => Ok(Variables::new()),
		_ => Err(ValidationError::VariablesNotAnObject),
	}
}

/// Check supplied variables against an operation’s declarations.
///
/// Every supplied variable must be declared, every non-null variable without a default value
/// must be supplied, and every value must have the shape of its declared type. Enums, input
/// objects, and custom scalars can’t be checked without the schema and accept any non-null value.
pub fn validate(operation: &str, definitions: &[VariableDefinition], variables: &Variables)
	-> Result<(), ValidationError>
{
	if let Some(undeclared) = variables.keys()
		.find(|name| !definitions.iter().any(|definition| &definition.name == *name))
	{
		return Err(ValidationError::UndeclaredVariable
		{
			variable: undeclared.clone(),
			operation: operation.to_owned(),
		});
	}

	for definition in definitions
	{
		match variables.get(&definition.name)
		{
			Some(value) => check_value(&definition.name, &definition.type_ref, value)?,
			None if matches!(definition.type_ref, TypeRef::NonNull(_)) && !definition.has_default =>
				return Err(ValidationError::MissingVariable
				{
					variable: definition.name.clone(),
					operation: operation.to_owned(),
					expected_type: definition.type_ref.to_string(),
				}),
			None => (),
		}
	}

	Ok(())
}

#[doc(hidden)]
fn check_value(path: &str, type_ref: &TypeRef, value: &serde_json::Value)
	-> Result<(), ValidationError>
{
	use serde_json::Value;

	let mismatch = || ValidationError::TypeMismatch
	{
		variable: path.to_owned(),
		expected_type: type_ref.to_string(),
		found: json_kind(value),
	};

	match (type_ref, value)
	{
		(TypeRef::NonNull(_), Value::Null) => Err(mismatch()),
		(TypeRef::NonNull(inner_type), _) => check_value(path, inner_type, value),
		(_, Value::Null) => Ok(()),
		(TypeRef::List(item_type), Value::Array(items)) =>
		{
			for (index, item) in items.iter().enumerate()
			{
				check_value(&format!("{path}[{index}]"), item_type, item)?;
			}

			Ok(())
		},
		(TypeRef::List(_), _) => Err(mismatch()),
		(TypeRef::Named(name), _) =>
		{
			let matches = match name.as_str()
			{
				"String" => value.is_string(),
				// IDs are serialized as strings, but integer input is accepted as well
				"ID" => value.is_string() || value.is_i64() || value.is_u64(),
				"Int" => value.as_i64()
					.map_or(false, |number| i32::try_from(number).is_ok()),
				"Float" => value.is_number(),
				"Boolean" => value.is_boolean(),
				_ => true,
			};

			match matches
			{
				true => Ok(()),
				false => Err(mismatch()),
			}
		},
	}
}

#[doc(hidden)]
fn json_kind(value: &serde_json::Value) -> &'static str
{
	use serde_json::Value;

	match value
	{
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(number) if number.is_f64() => "a floating-point number",
		Value::Number(_) => "an integer",
		Value::String(_) => "a string",
		Value::Array(_) => "a list",
		Value::Object(_) => "an object",
	}
}
