//! Parsing of REPL input lines.
//!
//! Lines starting with `/` are commands; any other line is a chat question
//! in chat mode.

use std::path::PathBuf;

use anyhow::{anyhow, bail};
use tutor_core::{Command, ExamSettings, Mode, QuestionCount, TimeLimit};

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Commands for the driver, applied in order.
    Run(Vec<Command>),
    /// Print the command list.
    Help,
    /// Print the active view again.
    Show,
    /// Leave the program.
    Quit,
}

/// Command reference printed by `/help`.
pub const HELP: &str = "\
명령어:
  /mode <chat|exam|flashcard>   모드 전환
  /file <경로>                  PDF 파일 선택
  /upload [경로]                선택한 PDF 업로드
  /config <문제 수> <초>         시험 설정 (3/5/10문제, 60/180/300/600초)
  /start                        시험 시작
  /answer <번호> <답안>         답안 입력
  /submit                       답안 제출
  /new                          새 시험
  /refresh                      암기 카드 새로고침
  /flip <번호>                  카드 뒤집기
  /show                         현재 화면 다시 보기
  /help                         도움말
  /quit                         종료
대화 모드에서는 그냥 입력하면 질문이 전송됩니다.";

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns a usage message for unknown commands or bad arguments.
pub fn parse_input(line: &str, mode: Mode) -> anyhow::Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(command) = line.strip_prefix('/') else {
        if mode == Mode::Chat {
            return Ok(Some(Input::Run(vec![Command::Send(line.to_string())])));
        }
        bail!("명령어는 /help 로 확인하세요.");
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    let input = match name {
        "help" | "h" => Input::Help,
        "show" => Input::Show,
        "quit" | "exit" | "q" => Input::Quit,
        "mode" => {
            let mode = Mode::from_str_case_insensitive(rest)
                .ok_or_else(|| anyhow!("사용법: /mode <chat|exam|flashcard>"))?;
            Input::Run(vec![Command::SwitchMode(mode)])
        }
        "file" => {
            if rest.is_empty() {
                bail!("사용법: /file <경로>");
            }
            Input::Run(vec![Command::SelectFile(PathBuf::from(rest))])
        }
        "upload" => {
            let mut commands = Vec::new();
            if !rest.is_empty() {
                commands.push(Command::SelectFile(PathBuf::from(rest)));
            }
            commands.push(Command::Upload);
            Input::Run(commands)
        }
        "config" => Input::Run(vec![Command::ConfigureExam(parse_settings(rest)?)]),
        "start" => Input::Run(vec![Command::StartExam]),
        "answer" => {
            let (number, text) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, ""), |(n, t)| (n, t.trim()));
            let index = parse_number(number, "사용법: /answer <번호> <답안>")?;
            Input::Run(vec![Command::Answer {
                index,
                text: text.to_string(),
            }])
        }
        "submit" => Input::Run(vec![Command::SubmitExam]),
        "new" => Input::Run(vec![Command::RestartExam]),
        "refresh" => Input::Run(vec![Command::RefreshDeck]),
        "flip" => Input::Run(vec![Command::Flip(parse_number(rest, "사용법: /flip <번호>")?)]),
        other => bail!("알 수 없는 명령어입니다: /{other}"),
    };

    Ok(Some(input))
}

/// Parses a one-based item number into a zero-based index.
fn parse_number(raw: &str, usage: &str) -> anyhow::Result<usize> {
    match raw.parse::<usize>() {
        Ok(number) if number > 0 => Ok(number - 1),
        _ => bail!("{usage}"),
    }
}

fn parse_settings(rest: &str) -> anyhow::Result<ExamSettings> {
    const USAGE: &str = "사용법: /config <3|5|10> <60|180|300|600>";

    let mut parts = rest.split_whitespace();
    let (Some(count), Some(secs), None) = (parts.next(), parts.next(), parts.next()) else {
        bail!(USAGE);
    };
    let count: u32 = count.parse().map_err(|_| anyhow!(USAGE))?;
    let secs: u32 = secs.parse().map_err(|_| anyhow!(USAGE))?;

    Ok(ExamSettings {
        question_count: QuestionCount::try_from(count).map_err(|e| anyhow!(e))?,
        time_limit: TimeLimit::try_from(secs).map_err(|e| anyhow!(e))?,
    })
}
