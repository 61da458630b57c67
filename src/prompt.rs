use crate::errors::SyncError;
use anyhow::Result;
use std::collections::BTreeSet;
use std::io::{self, Write};

// An empty read (stdin closed) or a lone "q" both count as the user
// backing out; callers surface that as a cancelled run.
fn read_answer(prompt_text: &str) -> Result<Option<String>> {
    print!("{prompt_text}");
    io::stdout().flush().ok();
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input)?;
    if read == 0 {
        return Ok(None);
    }
    let input = input.trim().to_string();
    if input.eq_ignore_ascii_case("q") {
        return Ok(None);
    }
    Ok(Some(input))
}

pub fn select(title: &str, choices: &[&str]) -> Result<usize> {
    println!("{title}");
    for (index, choice) in choices.iter().enumerate() {
        println!("  {}) {}", index + 1, choice);
    }
    loop {
        let Some(answer) = read_answer("> ")? else {
            return Err(SyncError::Cancelled.into());
        };
        match answer.parse::<usize>() {
            Ok(number) if (1..=choices.len()).contains(&number) => return Ok(number - 1),
            _ => println!(
                "Enter a number between 1 and {} (or q to quit).",
                choices.len()
            ),
        }
    }
}

pub fn confirm(question: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
    loop {
        let Some(answer) = read_answer(&format!("{question} {hint} "))? else {
            return Err(SyncError::Cancelled.into());
        };
        if answer.is_empty() {
            return Ok(default_yes);
        }
        match answer.to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer y or n (or q to quit)."),
        }
    }
}

pub fn multi_select(
    title: &str,
    items: &[String],
    selected: &BTreeSet<String>,
) -> Result<BTreeSet<String>> {
    let mut picked: Vec<bool> = items.iter().map(|item| selected.contains(item)).collect();
    println!("{title}");
    loop {
        for (index, item) in items.iter().enumerate() {
            let mark = if picked[index] { "x" } else { " " };
            println!("  [{mark}] {}) {}", index + 1, item);
        }
        let Some(answer) = read_answer("Toggle numbers (a = all, n = none, blank = done): ")?
        else {
            return Err(SyncError::Cancelled.into());
        };
        if answer.is_empty() {
            return Ok(items
                .iter()
                .enumerate()
                .filter(|(index, _)| picked[*index])
                .map(|(_, item)| item.clone())
                .collect());
        }
        match answer.as_str() {
            "a" => picked.iter_mut().for_each(|flag| *flag = true),
            "n" => picked.iter_mut().for_each(|flag| *flag = false),
            _ => {
                for token in answer.split([',', ' ']).filter(|token| !token.is_empty()) {
                    match token.parse::<usize>() {
                        Ok(number) if (1..=items.len()).contains(&number) => {
                            picked[number - 1] = !picked[number - 1];
                        }
                        _ => println!(
                            "Ignoring {token:?} (expected a number between 1 and {}).",
                            items.len()
                        ),
                    }
                }
            }
        }
    }
}
