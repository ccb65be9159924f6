use clap::Args;

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Space-separated `key:value` tokens plus at most one bare word.
    #[arg(allow_hyphen_values = true, default_value = "")]
    pub query: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(allow_hyphen_values = true)]
    pub text: String,
    /// Match the whole text as one phrase.
    #[arg(long, default_value_t = false)]
    pub exact: bool,
}

#[derive(Debug, Args)]
pub struct ProjectsArgs {
    #[arg(allow_hyphen_values = true)]
    pub query: Option<String>,
    /// Print an indented tree instead of JSON.
    #[arg(long, default_value_t = false)]
    pub print: bool,
}

#[derive(Debug, Args)]
pub struct ModifyArgs {
    #[arg(allow_hyphen_values = true)]
    pub query: String,
    /// Field assignment, `project=<path>` or `archived=<true|false>`.
    #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
    pub set: Vec<String>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub link: String,
    /// Left blank, the page title is fetched when `--fetch-title` is given.
    #[arg(long, default_value = "")]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value = "")]
    pub project: String,
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,
    #[arg(long, default_value_t = false)]
    pub fetch_title: bool,
}

#[derive(Debug, Args)]
pub struct IdArg {
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct AutocompleteArgs {
    pub key: String,
    #[arg(default_value = "")]
    pub value: String,
}
