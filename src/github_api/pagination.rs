use crate::models::Connection;
use crate::TransportError;

/// State of a cursor walk over the pages of a connection.
#[doc(hidden)]
struct Walk<T>
{
	variables: crate::graphql::Variables,
	/// Reported once all nodes fetched before it occurred have been yielded.
	pending_error: Option<crate::Error>,
	cursor: Option<String>,
	nodes: std::collections::VecDeque<T>,
	finished: bool,
	pages: usize,
}

impl super::Client
{
	/// Lazily walk all pages of a paginated connection and yield its nodes.
	///
	/// # Arguments
	/// - `operation_name`: A bundled query declaring an `$endCursor: String` variable that is
	///   passed as the connection’s `after` argument.
	/// - `variables`: All other variables of the query (`endCursor` is managed by the walk).
	/// - `connection_path`: JSON pointer to the connection within the response data (example:
	///   `/organization/repositories`).
	///
	/// The first page is requested without a cursor, and every further page with the previous
	/// page’s `pageInfo.endCursor`, until a page reports `hasNextPage` as false. Requests are only
	/// made when the consumer asks for a node beyond the ones already fetched. Every call starts a
	/// fresh walk. If a request fails midway, the stream yields that error and ends.
	pub fn paginate<'a, V, T>(&'a self, operation_name: &'a str, variables: &V,
		connection_path: &'a str)
		-> impl futures::Stream<Item = Result<T, crate::Error>> + 'a
	where
		V: serde::Serialize + ?Sized,
		T: serde::de::DeserializeOwned + 'a,
	{
		let (variables, pending_error) = match crate::graphql::variables::to_variables(variables)
		{
			Ok(variables) => (variables, None),
			Err(error) => (crate::graphql::Variables::new(), Some(error.into())),
		};

		let walk = Walk
		{
			variables,
			pending_error,
			cursor: None,
			nodes: std::collections::VecDeque::new(),
			finished: false,
			pages: 0,
		};

		futures::stream::try_unfold(walk,
			move |walk| self.advance(operation_name, connection_path, walk))
	}

	/// Yield the next node of a walk, fetching the next page if all fetched nodes were consumed.
	#[doc(hidden)]
	async fn advance<T>(&self, operation_name: &str, connection_path: &str, mut walk: Walk<T>)
		-> Result<Option<(T, Walk<T>)>, crate::Error>
	where
		T: serde::de::DeserializeOwned,
	{
		// Pages may be empty, so keep fetching until there is a node or the walk is over
		loop
		{
			if let Some(node) = walk.nodes.pop_front()
			{
				return Ok(Some((node, walk)));
			}

			if let Some(error) = walk.pending_error.take()
			{
				return Err(error);
			}

			if walk.finished
			{
				return Ok(None);
			}

			let mut variables = walk.variables.clone();
			variables.insert("endCursor".to_owned(),
				walk.cursor.clone().map_or(serde_json::Value::Null, serde_json::Value::String));

			let data: serde_json::Value = self.execute(operation_name, &variables).await?;

			let connection = data.pointer(connection_path).cloned()
				.ok_or_else(|| TransportError::MissingConnection
				{
					operation: operation_name.to_owned(),
					path: connection_path.to_owned(),
				})?;
			let page: Connection<T> = serde_json::from_value(connection)
				.map_err(TransportError::DecodeResponseData)?;

			walk.pages += 1;

			log::debug!("fetched page {} of “{}” with {} node(s)", walk.pages, operation_name,
				page.nodes.len());

			walk.nodes.extend(page.nodes);

			if page.page_info.has_next_page
			{
				// A cursor that doesn’t move would make the walk go on forever
				match page.page_info.end_cursor
				{
					Some(end_cursor) if walk.cursor.as_ref() != Some(&end_cursor) =>
						walk.cursor = Some(end_cursor),
					_ => walk.pending_error = Some(TransportError::StalledPagination
					{
						operation: operation_name.to_owned(),
					}.into()),
				}
			}
			else
			{
				walk.finished = true;
			}
		}
	}
}
