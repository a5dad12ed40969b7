/// All errors that may occur during initialization or while talking to the graph API.
#[derive(Debug, thiserror::Error)]
pub enum Error
{
	#[error("could not read config file")]
	ReadConfigFile(#[source] std::io::Error),
	#[error("could not parse config file")]
	ParseConfigFile(#[source] serde_yaml::Error),
	#[error("could not read repository list")]
	ReadRepositoryList(#[source] std::io::Error),
	#[error("could not parse repository list")]
	ParseRepositoryList(#[source] serde_yaml::Error),
	#[error("could not parse repository list")]
	ParseRepositoryListCsv(#[source] csv::Error),

	#[error("could not create HTTP client")]
	CreateHttpClient(#[source] reqwest::Error),
	#[error("no GitHub access token configured (set “access_token” in the config file or the \
		GITHUB_TOKEN environment variable)")]
	MissingAccessToken,
	#[error("could not load bundled GraphQL documents")]
	LoadBundledDocuments(#[source] ValidationError),

	#[error("invalid graph API request")]
	Validation(#[from] ValidationError),
	#[error("graph API request failed")]
	Transport(#[from] TransportError),
	#[error(transparent)]
	Remote(#[from] RemoteError),
}

/// Errors detected before a request is sent, either while composing an operation from its
/// documents or while checking the supplied variables against the operation’s declarations.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError
{
	#[error("could not parse GraphQL document")]
	ParseDocument(#[source] graphql_parser::query::ParseError),
	#[error("operation at line {line}, column {column} has no name")]
	AnonymousOperation
	{
		line: usize,
		column: usize,
	},

	#[error("operation “{0}” is defined more than once")]
	DuplicateOperation(String),
	#[error("fragment “{0}” is defined more than once")]
	DuplicateFragment(String),
	#[error("unknown operation “{0}”")]
	UnknownOperation(String),
	#[error("undefined fragment “{fragment}” referenced in “{referenced_in}”")]
	UndefinedFragment
	{
		fragment: String,
		referenced_in: String,
	},
	#[error("fragment cycle: {}", .0.join(" → "))]
	FragmentCycle(Vec<String>),
	#[error("variable “${variable}” is used in “{operation}” but never declared")]
	UndefinedVariable
	{
		variable: String,
		operation: String,
	},

	#[error("could not serialize variables")]
	SerializeVariables(#[source] serde_json::Error),
	#[error("variables must be a JSON object")]
	VariablesNotAnObject,
	#[error("variable “${variable}” is not declared by “{operation}”")]
	UndeclaredVariable
	{
		variable: String,
		operation: String,
	},
	#[error("required variable “${variable}” of type {expected_type} is missing for “{operation}”")]
	MissingVariable
	{
		variable: String,
		operation: String,
		expected_type: String,
	},
	#[error("variable “${variable}” should be of type {expected_type}, found {found}")]
	TypeMismatch
	{
		variable: String,
		expected_type: String,
		found: &'static str,
	},

	#[error("a required approving review count of {0} has no effect unless approving reviews \
		are required")]
	ApprovingReviewCountWithoutReviews(u32),
}

/// Errors that prevented a well-formed response from being received and decoded.
#[derive(Debug, thiserror::Error)]
pub enum TransportError
{
	#[error("could not make graph API request")]
	MakeRequest(#[source] reqwest_middleware::Error),
	#[error("graph API request timed out after {0:?}")]
	TimedOut(std::time::Duration),
	#[error("received HTTP error from graph API (status code {status_code}): {response_body}")]
	ReceivedHttpError
	{
		status_code: reqwest::StatusCode,
		url: url::Url,
		response_body: String,
	},
	#[error("could not decode graph API response body")]
	DecodeResponseBody(#[source] serde_json::Error),
	#[error("graph API response contains neither data nor errors")]
	MissingResponseData,
	#[error("could not decode graph API response data")]
	DecodeResponseData(#[source] serde_json::Error),
	#[error("no connection found at “{path}” in the response to “{operation}”")]
	MissingConnection
	{
		operation: String,
		path: String,
	},
	#[error("polymorphic result lacks a “__typename” discriminator")]
	MissingTypename,
	#[error("“{operation}” reported another page without a new end cursor")]
	StalledPagination
	{
		operation: String,
	},
}

/// A single entry of the `errors` array in a graph API response envelope.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct GraphQlError
{
	pub message: String,
	/// Machine-readable error category as reported by GitHub (example: `NOT_FOUND`).
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
	#[serde(default)]
	pub path: Option<Vec<serde_json::Value>>,
}

/// The graph endpoint answered with one or more errors for an operation.
#[derive(Debug, thiserror::Error)]
#[error("graph API reported errors for “{operation}”: {}", messages(.errors))]
pub struct RemoteError
{
	pub operation: String,
	pub errors: Vec<GraphQlError>,
}

impl RemoteError
{
	/// The messages of all reported errors, in the order the endpoint reported them.
	pub fn messages(&self) -> Vec<&str>
	{
		self.errors.iter().map(|error| error.message.as_str()).collect()
	}
}

#[doc(hidden)]
fn messages(errors: &[GraphQlError]) -> String
{
	errors.iter().map(|error| error.message.as_str()).collect::<Vec<_>>().join("; ")
}
