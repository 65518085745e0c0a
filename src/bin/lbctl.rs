use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "lbctl")]
#[command(about = "Management CLI for the load balancer simulator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a simulation
    Start {
        #[arg(short = 'n', long)]
        num_servers: Option<usize>,
        /// round_robin, least_connections, ip_hash or random
        #[arg(short, long)]
        algorithm: Option<String>,
        /// Seconds between health checks
        #[arg(long)]
        interval: Option<f64>,
        /// Percent chance a server reports DOWN per tick
        #[arg(short, long)]
        fail_rate: Option<u8>,
    },
    /// Stop the running simulation
    Stop,
    /// Send one or more requests through the load balancer
    Send {
        #[arg(short, long, default_value_t = 1)]
        count: usize,
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        client_ip: Option<String>,
        #[arg(short, long)]
        payload: Option<String>,
    },
    /// Show backends, algorithm and metrics
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Start { num_servers, algorithm, interval, fail_rate } => {
            let mut body = Map::new();
            insert(&mut body, "num_servers", num_servers.map(Value::from));
            insert(&mut body, "algorithm", algorithm.map(Value::from));
            insert(&mut body, "health_check_interval", interval.map(Value::from));
            insert(&mut body, "fail_rate", fail_rate.map(Value::from));

            let res = client.post(format!("{}/api/start", cli.url)).json(&body).send().await?;
            print_response(res).await?;
        }
        Commands::Stop => {
            let res = client.post(format!("{}/api/stop", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Send { count, client_id, client_ip, payload } => {
            let mut body = Map::new();
            insert(&mut body, "client_id", client_id.map(Value::from));
            insert(&mut body, "client_ip", client_ip.map(Value::from));
            insert(&mut body, "payload", payload.map(Value::from));

            for _ in 0..count {
                let res = client
                    .post(format!("{}/api/send_request", cli.url))
                    .json(&body)
                    .send()
                    .await?;
                print_response(res).await?;
            }
        }
        Commands::Status => {
            let res = client.get(format!("{}/api/status", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn insert(body: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        body.insert(key.to_string(), value);
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: simulator returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
