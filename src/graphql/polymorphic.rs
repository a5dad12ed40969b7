use crate::TransportError;

/// Name of the field the graph endpoint uses to report the concrete type of a result.
pub const TYPENAME_FIELD: &str = "__typename";

/// A result whose concrete type is one of a declared set of object types, such as a union or an
/// interface selected with `... on Type` fragments.
///
/// Implementations are decoded exclusively by the `__typename` discriminator, so the selection
/// set producing them must request `__typename`.
pub trait Polymorphic: Sized
{
	/// The concrete types this result can take on.
	const POSSIBLE_TYPES: &'static [&'static str];

	/// Decode a node whose `__typename` is one of [Polymorphic::POSSIBLE_TYPES].
	fn from_concrete(typename: &str, node: serde_json::Value) -> Result<Self, serde_json::Error>;

	/// Represent a node of a concrete type not known to this client.
	fn unknown(typename: String) -> Self;
}

/// Decode a polymorphic node into the variant matching its `__typename`.
///
/// Nodes of a type outside [Polymorphic::POSSIBLE_TYPES] resolve to [Polymorphic::unknown].
/// Nodes without a discriminator are rejected rather than matched by their structure.
pub fn resolve_polymorphic<T>(node: serde_json::Value) -> Result<T, TransportError>
where
	T: Polymorphic,
{
	let typename = node.get(TYPENAME_FIELD)
		.and_then(serde_json::Value::as_str)
		.ok_or(TransportError::MissingTypename)?
		.to_owned();

	if !T::POSSIBLE_TYPES.contains(&typename.as_str())
	{
		log::debug!("received node of unexpected type “{typename}”");

		return Ok(T::unknown(typename));
	}

	T::from_concrete(&typename, node).map_err(TransportError::DecodeResponseData)
}

/// Implement [serde::Deserialize] for a [Polymorphic] type by way of [resolve_polymorphic], so
/// that it can be nested in other response types.
macro_rules! deserialize_polymorphic
{
	($type:ty) =>
	{
		impl<'de> serde::Deserialize<'de> for $type
		{
			fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
			where
				D: serde::Deserializer<'de>,
			{
				let node = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;

				$crate::graphql::resolve_polymorphic(node).map_err(serde::de::Error::custom)
			}
		}
	};
}

pub(crate) use deserialize_polymorphic;
