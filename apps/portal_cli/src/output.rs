use serde::Serialize;
use shared::error::ApiError;

#[derive(Serialize)]
struct JsonOut<T> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct JsonErr<'a> {
    ok: bool,
    error: &'a ApiError,
}

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

pub fn print_error(json: bool, error: &ApiError) {
    if json {
        match serde_json::to_string_pretty(&JsonErr { ok: false, error }) {
            Ok(body) => println!("{body}"),
            Err(_) => eprintln!("error: {}", error.message),
        }
    } else {
        eprintln!("error: {}", error.message);
    }
}
