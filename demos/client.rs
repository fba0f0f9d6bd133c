use argh::FromArgs;

mod messages;

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Client for triggering classifications and reading the screen
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "classify" or "results"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Classify(ClassifyCommand),
    Results(ResultsCommand),
}

#[derive(FromArgs)]
/// Fetch a new image and classify it
#[argh(subcommand, name = "classify")]
struct ClassifyCommand {
    /// the image url to use instead of the server default
    #[argh(option, short = 'u')]
    image_url: Option<String>,
}

#[derive(FromArgs)]
/// Show the current image size and result label
#[argh(subcommand, name = "results")]
struct ResultsCommand {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let response = match args.command {
        ClientCommands::Classify(classify_command) => {
            client
                .post(format!("http://{}/classify", addr))
                .json(&messages::ClassifyRequest {
                    image_url: classify_command.image_url,
                })
                .send()
                .await?
        }
        ClientCommands::Results(_) => {
            client
                .get(format!("http://{}/results", addr))
                .send()
                .await?
        }
    };

    let status = response.status();
    let result = response.json::<serde_json::Value>().await?;
    println!("{}: {}", status, serde_json::to_string_pretty(&result)?);

    Ok(())
}
