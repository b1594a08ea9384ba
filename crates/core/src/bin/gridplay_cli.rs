//! CLI client for the `gridplayd` daemon.
//!
//! Examples:
//!   gridplay-cli maps
//!   gridplay-cli start level-1 default
//!   gridplay-cli step right
//!   gridplay-cli replay optimal level-1 run-42 default
//!   gridplay-cli replay play
//!
//! By default it talks to 127.0.0.1:9877; override with `--addr host:port`.

use gridplay::env::{StepEvent, StepResult};
use gridplay::grid::Pos;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Request {
    ListMaps,
    ListRules,
    StartSession {
        map_id: String,
        rule_id: String,
    },
    Restart,
    Step {
        direction: String,
    },
    GetSession,
    LoadReplay {
        map_id: String,
        path_id: String,
    },
    LoadOptimalPath {
        map_id: String,
        qtable_id: String,
        rule_id: Option<String>,
    },
    ReplayAdvance,
    ReplayReset,
    ReplayPlay,
    ReplayPause,
    GetReplay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Response {
    Maps { maps: Vec<String> },
    Rules { rules: Vec<RuleSummary> },
    Session(Box<SessionSnapshot>),
    Step(StepResult),
    Replay(Box<ReplaySnapshot>),
    Success { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleSummary {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    max_steps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionSnapshot {
    map_id: String,
    rule_id: String,
    grid: Vec<Vec<String>>,
    position: Pos,
    score: i64,
    step_count: u32,
    #[serde(default)]
    max_steps: u32,
    terminated: bool,
    #[serde(default)]
    last_event: Option<StepEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReplaySnapshot {
    map_id: String,
    #[serde(default)]
    source: String,
    grid: Vec<Vec<String>>,
    index: usize,
    len: usize,
    position: Pos,
    #[serde(default)]
    score: Option<i64>,
    at_end: bool,
    #[serde(default)]
    playing: bool,
    #[serde(default)]
    trail: Vec<Pos>,
}

fn usage() -> ! {
    eprintln!("gridplay-cli (talks to gridplayd @ 127.0.0.1:9877 by default)");
    eprintln!("Usage: gridplay-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  maps | rules                List stored maps / rule sets");
    eprintln!("  start <map> <rules>         Start a manual-play session");
    eprintln!("  restart                     Play again with the same map and rules");
    eprintln!("  step <up|down|left|right>   Move the agent (ArrowUp etc. also accepted)");
    eprintln!("  status                      Show the current session");
    eprintln!("  replay load <map> <path>    Load a stored path for replay");
    eprintln!("  replay optimal <map> <qtable> [rules]");
    eprintln!("                              Replay the greedy path of a Q-table, scored under [rules]");
    eprintln!("  replay <play|pause|advance|reset|status>");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = "127.0.0.1:9877".to_string();
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

fn send_request(addr: &str, req: &Request) -> Result<Response, String> {
    let mut stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    let mut reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);

    let line = serde_json::to_string(req).map_err(|e| format!("serialize: {e}"))?;
    stream
        .write_all(line.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .map_err(|e| format!("send: {e}"))?;

    let mut resp_line = String::new();
    reader
        .read_line(&mut resp_line)
        .map_err(|e| format!("recv: {e}"))?;
    serde_json::from_str(&resp_line).map_err(|e| format!("parse response: {e}"))
}

/// Grid with the agent drawn as `@` and `trail` cells as `.` over empty floor.
fn print_grid(grid: &[Vec<String>], agent: Pos, trail: &[Pos]) {
    for (i, row) in grid.iter().enumerate() {
        let line: Vec<&str> = row
            .iter()
            .enumerate()
            .map(|(j, code)| {
                let here = Pos::new(i, j);
                if here == agent {
                    "@"
                } else if code == "0" && trail.contains(&here) {
                    "."
                } else {
                    code.as_str()
                }
            })
            .collect();
        println!("  {}", line.join(" "));
    }
}

fn print_session(s: &SessionSnapshot) {
    println!(
        "map={} rules={} pos={} score={} steps={}/{} terminated={} last={}",
        s.map_id,
        s.rule_id,
        s.position,
        s.score,
        s.step_count,
        s.max_steps,
        s.terminated,
        s.last_event.map(|e| e.as_str()).unwrap_or("-"),
    );
    print_grid(&s.grid, s.position, &[]);
}

fn print_step(r: &StepResult) {
    let deltas: Vec<String> = r
        .rewards
        .iter()
        .map(|d| format!("{:?}={}", d.kind, d.amount))
        .collect();
    println!(
        "{} -> pos={} score={} steps={} terminated={} [{}]",
        r.event.as_str(),
        r.position,
        r.score,
        r.step_count,
        r.terminated,
        deltas.join(", "),
    );
}

fn print_replay(r: &ReplaySnapshot) {
    let score = r
        .score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "map={} source={} step={}/{} pos={} score={} playing={} at_end={}",
        r.map_id,
        r.source,
        r.index,
        r.len.saturating_sub(1),
        r.position,
        score,
        r.playing,
        r.at_end,
    );
    print_grid(&r.grid, r.position, &r.trail);
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = &args[0];

    let arg = |i: usize| -> String { args.get(i).cloned().unwrap_or_else(|| usage()) };

    let req = match cmd.as_str() {
        "maps" => Request::ListMaps,
        "rules" => Request::ListRules,
        "status" => Request::GetSession,
        "start" => Request::StartSession {
            map_id: arg(1),
            rule_id: arg(2),
        },
        "restart" => Request::Restart,
        "step" => Request::Step { direction: arg(1) },
        "replay" => match arg(1).as_str() {
            "load" => Request::LoadReplay {
                map_id: arg(2),
                path_id: arg(3),
            },
            "optimal" => Request::LoadOptimalPath {
                map_id: arg(2),
                qtable_id: arg(3),
                rule_id: args.get(4).cloned(),
            },
            "play" => Request::ReplayPlay,
            "pause" => Request::ReplayPause,
            "advance" => Request::ReplayAdvance,
            "reset" => Request::ReplayReset,
            "status" => Request::GetReplay,
            _ => usage(),
        },
        _ => usage(),
    };

    match send_request(&addr, &req) {
        Ok(Response::Maps { maps }) => {
            for m in maps {
                println!("{m}");
            }
        }
        Ok(Response::Rules { rules }) => {
            for r in rules {
                println!("{:<20} {:<24} maxSteps={}", r.id, r.name, r.max_steps);
            }
        }
        Ok(Response::Session(s)) => print_session(&s),
        Ok(Response::Step(r)) => print_step(&r),
        Ok(Response::Replay(r)) => print_replay(&r),
        Ok(Response::Success { message }) => println!("OK: {message}"),
        Ok(Response::Error { message }) => {
            eprintln!("Error: {message}");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
