//! echo-memory 交互式控制台
//!
//! 普通输入作为 user 消息写入记忆；以 `/` 开头的是命令：
//!
//! ```text
//! /agent <text>     以 agent 身份写入
//! /system <text>    以 system 身份写入
//! /search <query>   按相关度检索
//! /snapshot         按插入顺序列出记忆内容
//! /stats            容量、淘汰数、实体与主题
//! /save             保存记忆状态到 --checkpoint 指定的文件
//! /forget           删除当前会话已保存的状态
//! /help /quit
//! ```
//!
//! # 运行
//! ```bash
//! cargo run -- --capacity 5 --checkpoint ~/.echo-memory/checkpoints.json
//! ```

use clap::Parser;
use echo_memory::config::MemoryConfig;
use echo_memory::error::Result;
use echo_memory::memory::{
    BoundedConversationMemory, Checkpointer, FileCheckpointer, MemoryHandle, Role,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "echo-memory", about = "有界对话记忆的交互式控制台")]
struct Cli {
    /// 最大消息条数（覆盖配置文件与环境变量）
    #[arg(short, long, allow_negative_numbers = true)]
    capacity: Option<i64>,

    /// YAML 配置文件；缺省时从 ECHO_MEMORY_* 环境变量读取
    #[arg(long)]
    config: Option<String>,

    /// 状态文件路径，启动时恢复、`/save` 时写入
    #[arg(long, env = "ECHO_MEMORY_CHECKPOINT")]
    checkpoint: Option<PathBuf>,

    /// 状态所属会话
    #[arg(long, default_value = "default")]
    session: String,
}

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Add(Role, &'a str),
    Search(&'a str),
    Snapshot,
    Stats,
    Save,
    Forget,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Add(Role::User, line));
    };
    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((rest, ""));
    Some(match name {
        "agent" => Command::Add(Role::Agent, arg),
        "system" => Command::Add(Role::System, arg),
        "user" => Command::Add(Role::User, arg),
        "search" => Command::Search(arg),
        "snapshot" => Command::Snapshot,
        "stats" => Command::Stats,
        "save" => Command::Save,
        "forget" => Command::Forget,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other),
    })
}

fn print_help() {
    println!("  <text>            写入一条 user 消息");
    println!("  /agent <text>     写入一条 agent 消息");
    println!("  /system <text>    写入一条 system 消息");
    println!("  /search <query>   相关度检索");
    println!("  /snapshot         列出当前记忆");
    println!("  /stats            统计信息");
    println!("  /save             保存记忆状态");
    println!("  /forget           删除已保存的状态");
    println!("  /quit             退出");
}

fn load_config(cli: &Cli) -> Result<MemoryConfig> {
    let mut config = match &cli.config {
        Some(path) => MemoryConfig::load(path)?,
        None => MemoryConfig::from_env()?,
    };
    if let Some(capacity) = cli.capacity {
        config.capacity = capacity;
        config.validate()?;
    }
    Ok(config)
}

/// 终端输入线程
///
/// rustyline 是阻塞读取，放在独立线程里，避免占用 tokio 工作线程。
/// 主循环每处理完一条输入才发出下一次读取信号，保证提示符不与输出交错。
struct Console {
    ready: std::sync::mpsc::Sender<()>,
    lines: mpsc::UnboundedReceiver<String>,
}

impl Console {
    fn spawn() -> Self {
        let (ready, ready_rx) = std::sync::mpsc::channel::<()>();
        let (tx, lines) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(e) => {
                    warn!("初始化终端失败: {e}");
                    return;
                }
            };
            while ready_rx.recv().is_ok() {
                match editor.readline("memory> ") {
                    Ok(line) => {
                        let _ = editor.add_history_entry(line.as_str());
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                    Err(e) => {
                        warn!("读取输入失败: {e}");
                        break;
                    }
                }
            }
        });
        Self { ready, lines }
    }

    /// 读取下一行；输入结束（Ctrl-C / Ctrl-D）时返回 `None`
    async fn next_line(&mut self) -> Option<String> {
        self.ready.send(()).ok()?;
        self.lines.recv().await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "echo_memory=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        capacity = config.capacity,
        topics = ?config.topics.topics().collect::<Vec<_>>(),
        "配置已加载"
    );

    let checkpointer = match &cli.checkpoint {
        Some(path) => Some(FileCheckpointer::new(path)?),
        None => None,
    };
    let saved = match &checkpointer {
        Some(cp) => cp.load(&cli.session).await?,
        None => None,
    };
    let builder = BoundedConversationMemory::from_config(config);
    let memory = match saved {
        Some(checkpoint) => {
            info!(checkpoint_id = %checkpoint.checkpoint_id, saved_at = checkpoint.saved_at, "读取会话快照");
            BoundedConversationMemory::restore(builder, checkpoint.state)?
        }
        None => builder.build()?,
    };
    info!(session = %cli.session, size = memory.size(), capacity = memory.capacity(), "记忆已就绪");

    let handle = MemoryHandle::spawn(memory);
    let mut console = Console::spawn();
    println!("输入 /help 查看命令");

    while let Some(line) = console.next_line().await {
        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            Command::Add(_, "") => println!("  ⚠️ 消息内容为空"),
            Command::Add(role, text) => {
                let message = handle.add_message(role, text).await?;
                println!(
                    "  #{} [{}] 实体: {:?} 主题: {:?}",
                    message.id, message.role, message.entities, message.topics
                );
            }
            Command::Search(query) => match handle.search(query, None).await {
                Ok(hits) if hits.is_empty() => println!("  (没有相关记忆)"),
                Ok(hits) => {
                    for hit in hits {
                        let b = hit.breakdown;
                        println!(
                            "  {:.3} #{} [{}] {}  (entity {:.2} topic {:.2} text {:.2} recency {:.2})",
                            hit.score,
                            hit.message.id,
                            hit.message.role,
                            hit.message.content,
                            b.entity,
                            b.topic,
                            b.text,
                            b.recency
                        );
                    }
                }
                Err(e) => println!("  ⚠️ {e}"),
            },
            Command::Snapshot => {
                for m in handle.snapshot().await? {
                    println!("  #{} [{}] {}", m.id, m.role, m.content);
                }
            }
            Command::Stats => {
                let stats = handle.stats().await?;
                println!(
                    "  {}/{} 条，累计写入 {}，已淘汰 {}",
                    stats.size, stats.capacity, stats.total_added, stats.evicted
                );
                println!("  实体: {}", stats.entities.join(", "));
                println!("  主题: {}", stats.topics.join(", "));
            }
            Command::Save => match &checkpointer {
                Some(cp) => {
                    let id = cp.save(&cli.session, handle.export_state().await?).await?;
                    println!("  💾 已保存快照 {id}");
                }
                None => println!("  ⚠️ 未指定 --checkpoint"),
            },
            Command::Forget => match &checkpointer {
                Some(cp) => {
                    if cp.remove(&cli.session).await? {
                        println!("  🗑️ 已删除会话 {} 的快照", cli.session);
                    } else {
                        println!("  (会话 {} 没有已保存的快照)", cli.session);
                    }
                }
                None => println!("  ⚠️ 未指定 --checkpoint"),
            },
            Command::Help => print_help(),
            Command::Quit => break,
            Command::Unknown(name) => println!("  未知命令 /{name}，输入 /help 查看"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(
            parse_command("Hola, me llamo Ana"),
            Some(Command::Add(Role::User, "Hola, me llamo Ana"))
        );
        assert_eq!(
            parse_command("/agent  Ana trabaja en marketing "),
            Some(Command::Add(Role::Agent, "Ana trabaja en marketing"))
        );
        assert_eq!(parse_command("/search Ana"), Some(Command::Search("Ana")));
        assert_eq!(parse_command("/search"), Some(Command::Search("")));
        assert_eq!(parse_command("/forget"), Some(Command::Forget));
        assert_eq!(parse_command("/exit"), Some(Command::Quit));
        assert_eq!(parse_command("/nope x"), Some(Command::Unknown("nope")));
    }
}
