mod operations;
mod pagination;

pub use operations::MutationAcknowledgment;

use crate::{RemoteError, TransportError};

/// Configuration of the GitHub graph API client.
#[derive(serde::Deserialize)]
pub struct Config
{
	/// The URL of the GraphQL endpoint (optional, default: <https://api.github.com/graphql>). For
	/// GitHub Enterprise Server, this is `https://HOSTNAME/api/graphql`.
	#[serde(default = "github_com_graphql_url")]
	endpoint: url::Url,
	/// A personal access token or installation access token with the scopes needed for the
	/// operations to run (optional, defaults to the `GITHUB_TOKEN` environment variable).
	#[serde(default)]
	access_token: Option<String>,
	/// Time in seconds after which a single request is aborted (optional, default: 30).
	#[serde(default = "default_timeout_seconds")]
	timeout_seconds: u64,
	/// Number of nodes to request per page when walking paginated connections (optional,
	/// default: 100, which is the maximum GitHub allows).
	#[serde(default = "default_page_size")]
	page_size: u32,
	/// How to retry requests that failed for transient reasons such as network issues.
	#[serde(default)]
	retry: RetryConfig,
}

impl Default for Config
{
	fn default() -> Self
	{
		Self
		{
			endpoint: github_com_graphql_url(),
			access_token: None,
			timeout_seconds: default_timeout_seconds(),
			page_size: default_page_size(),
			retry: RetryConfig::default(),
		}
	}
}

/// Bounds of the exponential backoff used to retry failed requests.
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig
{
	/// Delay in seconds before the first retry.
	min_interval_seconds: u64,
	/// Upper bound in seconds for the delay between two retries.
	max_interval_seconds: u64,
	/// Number of retries after which a request is given up (0 disables retries).
	max_retries: u32,
}

impl Default for RetryConfig
{
	fn default() -> Self
	{
		Self
		{
			min_interval_seconds: 1,
			max_interval_seconds: 60,
			max_retries: 5,
		}
	}
}

#[doc(hidden)]
fn github_com_graphql_url() -> url::Url
{
	url::Url::parse("https://api.github.com/graphql")
		.expect("this call is infallible because we know the URL to be well-formed")
}

#[doc(hidden)]
fn default_timeout_seconds() -> u64
{
	30
}

#[doc(hidden)]
fn default_page_size() -> u32
{
	100
}

/// Per-call options of [Client::execute_with_options].
#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions
{
	/// Abort the request if no response arrived within this duration (default: the configured
	/// timeout).
	pub timeout: Option<std::time::Duration>,
}

/// A client executing the bundled GraphQL operations against the GitHub graph API.
///
/// Operations are referred to by name. Before anything is sent, the operation is composed from
/// its document and the fragments it uses, and the variables are checked against the types the
/// operation declares. Queries that fail for reasons such as network issues or server errors are
/// retried with exponential backoff, while mutations are sent exactly once and errors reported by
/// the graph API itself are returned right away.
///
/// Each call is awaited until its response arrives or its timeout expires. Dropping the returned
/// future aborts the request, which leaves no state behind because every operation is a single,
/// self-contained request.
#[derive(Clone)]
pub struct Client
{
	#[doc(hidden)]
	config: std::sync::Arc<Config>,
	#[doc(hidden)]
	reqwest_client: reqwest_middleware::ClientWithMiddleware,
	/// Used for mutations, which must not be sent more than once.
	#[doc(hidden)]
	reqwest_client_without_retries: reqwest_middleware::ClientWithMiddleware,
	#[doc(hidden)]
	registry: std::sync::Arc<crate::graphql::Registry>,
	#[doc(hidden)]
	access_token: std::sync::Arc<AccessToken>,
}

impl Client
{
	/// Initialize a new graph API client with a given configuration.
	pub fn from_config(config: Config) -> Result<Self, crate::Error>
	{
		let access_token = config.access_token.clone()
			.or_else(|| std::env::var("GITHUB_TOKEN").ok())
			.filter(|access_token| !access_token.is_empty())
			.ok_or(crate::Error::MissingAccessToken)?;
		let access_token = std::sync::Arc::new(AccessToken(secstr::SecStr::from(access_token)));

		let registry = crate::graphql::Registry::bundled()
			.map_err(crate::Error::LoadBundledDocuments)?;

		// Initialize a new HTTP client
		let reqwest_client = reqwest::ClientBuilder::new()
			// Set a recognizable user agent to get meaningful debugging information from GitHub
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build().map_err(crate::Error::CreateHttpClient)?;

		// Wrap the HTTP client in middleware that retries requests in case of network failures
		// and transient server errors
		let min_interval = std::time::Duration::from_secs(config.retry.min_interval_seconds);
		let max_interval = std::time::Duration::from_secs(config.retry.max_interval_seconds)
			.max(min_interval);
		let retry_policy = reqwest_retry::policies::ExponentialBackoff::builder()
			.backoff_exponent(2)
			.retry_bounds(min_interval, max_interval)
			.build_with_max_retries(config.retry.max_retries);
		let retry_transient_middleware =
			reqwest_retry::RetryTransientMiddleware::new_with_policy(retry_policy);

		let reqwest_client_without_retries =
			reqwest_middleware::ClientBuilder::new(reqwest_client.clone()).build();
		let reqwest_client = reqwest_middleware::ClientBuilder::new(reqwest_client)
			.with(retry_transient_middleware)
			.build();

		log::debug!("using graph API endpoint {}", config.endpoint);

		Ok(Self
		{
			config: std::sync::Arc::new(config),
			reqwest_client,
			reqwest_client_without_retries,
			registry: std::sync::Arc::new(registry),
			access_token,
		})
	}

	/// Number of nodes requested per page when walking paginated connections.
	pub fn page_size(&self) -> u32
	{
		self.config.page_size
	}

	/// Execute a named operation with the configured timeout (for details, see
	/// [Client::execute_with_options]).
	pub async fn execute<V, R>(&self, operation_name: &str, variables: &V) -> Result<R, crate::Error>
	where
		V: serde::Serialize + ?Sized,
		R: serde::de::DeserializeOwned,
	{
		self.execute_with_options(operation_name, variables, &ExecuteOptions::default()).await
	}

	/// Execute a named query or mutation and decode the `data` field of its response.
	///
	/// # Arguments
	/// - `operation_name`: The name of a bundled operation (example: `showBranchProtection`).
	/// - `variables`: A serializable type or map with one entry per variable. The values must
	///   match the types the operation declares, or the call fails before a request is made.
	/// - `options`: Per-call options such as the timeout.
	///
	/// Only queries are retried on network failures and transient server errors. Mutations are not
	/// idempotent, so they are sent exactly once, and a failed mutation is neither retried nor
	/// undone by this client. Executing one twice has two separate effects on the remote side (or
	/// fails remotely the second time).
	pub async fn execute_with_options<V, R>(
		&self,
		operation_name: &str,
		variables: &V,
		options: &ExecuteOptions)
		-> Result<R, crate::Error>
	where
		V: serde::Serialize + ?Sized,
		R: serde::de::DeserializeOwned,
	{
		let operation = self.registry.compose(operation_name)?;
		let variables = crate::graphql::variables::to_variables(variables)?;
		crate::graphql::variables::validate(&operation.name, &operation.variables, &variables)?;

		let request_body = GraphQlRequest
		{
			query: &operation.query,
			operation_name: &operation.name,
			variables: &variables,
		};

		let timeout = options.timeout
			.unwrap_or_else(|| std::time::Duration::from_secs(self.config.timeout_seconds));

		let reqwest_client = match operation.kind
		{
			crate::graphql::OperationKind::Mutation => &self.reqwest_client_without_retries,
			_ => &self.reqwest_client,
		};

		log::debug!("executing {:?} “{}”", operation.kind, operation.name);

		let data = tokio::time::timeout(timeout,
			request(&self.config, reqwest_client, &request_body, &self.access_token))
			.await
			.map_err(|_| TransportError::TimedOut(timeout))??;

		serde_json::from_value(data)
			.map_err(|error| TransportError::DecodeResponseData(error).into())
	}
}

/// Body of a request to the graph endpoint.
#[doc(hidden)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a>
{
	query: &'a str,
	operation_name: &'a str,
	variables: &'a crate::graphql::Variables,
}

/// Envelope of every response from the graph endpoint.
#[doc(hidden)]
#[derive(serde::Deserialize)]
struct GraphQlResponse
{
	#[serde(default)]
	data: Option<serde_json::Value>,
	#[serde(default)]
	errors: Option<Vec<crate::GraphQlError>>,
}

/// Internal method for sending a request to the graph endpoint and unwrapping its envelope.
#[doc(hidden)]
async fn request(
	config: &Config,
	reqwest_client: &reqwest_middleware::ClientWithMiddleware,
	body: &GraphQlRequest<'_>,
	access_token: &AccessToken)
	-> Result<serde_json::Value, crate::Error>
{
	let map_reqwest_error = |error: reqwest::Error|
		TransportError::MakeRequest(reqwest_middleware::Error::Reqwest(error));

	let response = reqwest_client.request(reqwest::Method::POST, config.endpoint.clone())
		// Provide the access token using the Authentication header
		.bearer_auth(access_token)
		.json(body)
		// Send the request
		.send().await.map_err(TransportError::MakeRequest)?;

	let status_code = response.status();
	let url = response.url().to_owned();
	let response_body = response.bytes().await.map_err(map_reqwest_error)?;

	let remote_error = |errors| RemoteError{operation: body.operation_name.to_owned(), errors};

	if !status_code.is_success()
	{
		// An error status may still come with a regular error envelope, which is more specific
		// than the status code
		if let Ok(GraphQlResponse{errors: Some(errors), ..}) =
			serde_json::from_slice::<GraphQlResponse>(&response_body)
		{
			if !errors.is_empty()
			{
				return Err(remote_error(errors).into());
			}
		}

		// Decode the body for debugging purposes
		let response_body = String::from_utf8_lossy(&response_body).into_owned();

		return Err(TransportError::ReceivedHttpError{status_code, url, response_body}.into());
	}

	let response: GraphQlResponse = serde_json::from_slice(&response_body)
		.map_err(TransportError::DecodeResponseBody)?;

	// These operations aren’t batched, so partial data next to errors isn’t worth interpreting
	match response
	{
		GraphQlResponse{errors: Some(errors), ..} if !errors.is_empty() =>
		{
			log::debug!("“{}” failed with {} error(s)", body.operation_name, errors.len());

			Err(remote_error(errors).into())
		},
		GraphQlResponse{data: Some(data), ..} => Ok(data),
		_ => Err(TransportError::MissingResponseData.into()),
	}
}

#[doc(hidden)]
struct AccessToken(secstr::SecStr);

impl std::fmt::Display for AccessToken
{
	fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		write!(formatter, "{}", String::from_utf8_lossy(self.0.unsecure()))
	}
}

/// A client talking to a mock server without retrying failed requests.
#[cfg(test)]
pub(crate) fn test_client(server: &wiremock::MockServer) -> Client
{
	test_client_with_retries(server, 0)
}

/// A client talking to a mock server, retrying failed queries after one second each.
#[cfg(test)]
pub(crate) fn test_client_with_retries(server: &wiremock::MockServer, max_retries: u32) -> Client
{
	let config = Config
	{
		endpoint: url::Url::parse(&format!("{}/graphql", server.uri())).unwrap(),
		access_token: Some("test-token".to_owned()),
		page_size: 2,
		retry: RetryConfig
		{
			min_interval_seconds: 1,
			max_interval_seconds: 1,
			max_retries,
		},
		..Config::default()
	};

	Client::from_config(config).unwrap()
}
