//! # qlr
//!
//! Command line front-end over the query rewriting engine: render, count,
//! sort and inspect JPQL/HQL queries, or list their parameter bindings.

use clap::{Args, Parser, Subcommand};
use ql_rewrite::logging::facade::LogFacadeLogger;
use ql_rewrite::logging::{self, LogLevel, LoggingService};
use ql_rewrite::{
    parse_parameter_bindings, Dialect, Order, ParameterBinding, QueryEnhancer, ReturnedType, Sort, StatementType,
};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Query rewriting CLI
#[derive(Parser)]
#[command(name = "qlr", version)]
#[command(about = "Render, count, sort and inspect JPQL/HQL queries", long_about = None)]
struct Cli {
    /// Query dialect (jpql, hql)
    #[arg(short, long, global = true, default_value = "jpql")]
    dialect: Dialect,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryInput {
    /// Query text
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    query: Option<String>,

    /// Read the query from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl QueryInput {
    fn read(&self) -> Result<String, Box<dyn Error>> {
        match (&self.query, &self.file) {
            (Some(query), _) => Ok(query.clone()),
            (None, Some(path)) => {
                let text = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
                Ok(text.trim().to_string())
            }
            (None, None) => Err("No query given".into()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and render a query back
    Render {
        #[command(flatten)]
        input: QueryInput,
    },

    /// Derive the count query
    Count {
        #[command(flatten)]
        input: QueryInput,

        /// Expression to count instead of the primary alias
        #[arg(short, long)]
        projection: Option<String>,
    },

    /// Apply a sort
    Sort {
        #[command(flatten)]
        input: QueryInput,

        /// Sort key as property[:asc|desc][:ic][:nulls-first|nulls-last]; repeatable
        #[arg(short, long = "order", required = true)]
        orders: Vec<String>,

        /// Accept sort keys that are arbitrary expressions
        #[arg(long = "unsafe")]
        unsafe_orders: bool,

        /// Project into a DTO, written Type:property,property
        #[arg(long)]
        dto: Option<String>,
    },

    /// Print introspection metadata and bindings as JSON
    Inspect {
        #[command(flatten)]
        input: QueryInput,
    },

    /// Print the parameter bindings as JSON
    Bindings {
        #[command(flatten)]
        input: QueryInput,
    },
}

#[derive(Serialize)]
struct InspectReport<'a> {
    alias: Option<&'a str>,
    projection: String,
    has_constructor_expression: bool,
    statement_type: StatementType,
    has_cte: bool,
    has_from_function: bool,
    order_by_properties: Vec<String>,
    bindings: &'a [ParameterBinding],
    uses_jdbc_style_parameters: bool,
}

fn parse_sort(orders: &[String], unsafe_orders: bool) -> Result<Sort, Box<dyn Error>> {
    let mut sort = Sort::unsorted();
    for text in orders {
        let order: Order = text.parse()?;
        sort = sort.and(if unsafe_orders { order.unsafe_expression() } else { order });
    }
    Ok(sort)
}

fn parse_dto(text: &str) -> Result<ReturnedType, Box<dyn Error>> {
    let (type_name, properties) = text.split_once(':').unwrap_or((text, ""));
    if type_name.trim().is_empty() {
        return Err(format!("Missing DTO type in '{}'", text).into());
    }
    let properties = properties
        .split(',')
        .map(str::trim)
        .filter(|property| !property.is_empty());
    Ok(ReturnedType::dto(type_name.trim(), properties))
}

/// Run one command and return what it prints
fn execute(cli: &Cli) -> Result<String, Box<dyn Error>> {
    let dialect = cli.dialect;
    match &cli.command {
        Commands::Render { input } => Ok(QueryEnhancer::parse(&input.read()?, dialect)?.render()),

        Commands::Count { input, projection } => {
            let enhancer = QueryEnhancer::parse(&input.read()?, dialect)?;
            Ok(enhancer.create_count_query(projection.as_deref())?)
        }

        Commands::Sort {
            input,
            orders,
            unsafe_orders,
            dto,
        } => {
            let enhancer = QueryEnhancer::parse(&input.read()?, dialect)?;
            let sort = parse_sort(orders, *unsafe_orders)?;
            let returned = match dto {
                Some(dto) => parse_dto(dto)?,
                None => ReturnedType::Entity,
            };
            Ok(enhancer.apply_sorting_with(&sort, &returned)?)
        }

        Commands::Inspect { input } => {
            let enhancer = QueryEnhancer::parse(&input.read()?, dialect)?;
            let info = enhancer.query_information();
            let declared = enhancer.declared_query();
            let report = InspectReport {
                alias: enhancer.detect_alias(),
                projection: enhancer.projection(),
                has_constructor_expression: info.has_constructor_expression,
                statement_type: info.statement_type,
                has_cte: info.has_cte,
                has_from_function: info.has_from_function,
                order_by_properties: enhancer.order_by_properties(),
                bindings: declared.bindings(),
                uses_jdbc_style_parameters: declared.uses_jdbc_style_parameters(),
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }

        Commands::Bindings { input } => {
            let parsed = parse_parameter_bindings(&input.read()?)?;
            Ok(serde_json::to_string_pretty(&parsed)?)
        }
    }
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let service = LoggingService::new(Arc::new(LogFacadeLogger), LogLevel::Debug);
    logging::init_global_logging_with_service(Arc::new(service))?;
    log::debug!("qlr {} ready", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    match execute(&cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn run(args: &[&str]) -> Result<String, Box<dyn Error>> {
        let cli = Cli::try_parse_from(std::iter::once("qlr").chain(args.iter().copied()))?;
        execute(&cli)
    }

    #[test]
    fn test_render_and_count() {
        assert_eq!(
            run(&["render", "select u from User u where u.age > ?1"]).unwrap(),
            "select u from User u where u.age > ?1"
        );
        assert_eq!(
            run(&["count", "SELECT DISTINCT p.name FROM Person p"]).unwrap(),
            "SELECT COUNT(DISTINCT p.name) FROM Person p"
        );
        assert_eq!(
            run(&["count", "select u from User u", "--projection", "u.id"]).unwrap(),
            "select count(u.id) from User u"
        );
    }

    #[test]
    fn test_sort() {
        assert_eq!(
            run(&["sort", "select u from User u order by u.name", "-o", "age:desc"]).unwrap(),
            "select u from User u order by u.name, u.age desc"
        );
        assert!(run(&["sort", "select u from User u", "-o", "length(u.name)"]).is_err());
        assert_eq!(
            run(&["sort", "select u from User u", "-o", "length(u.name)", "--unsafe"]).unwrap(),
            "select u from User u order by length(u.name) asc"
        );
        assert_eq!(
            run(&["sort", "select u from User u", "-o", "name", "--dto", "com.example.Dto:name"]).unwrap(),
            "select new com.example.Dto(u.name) from User u order by u.name asc"
        );
    }

    #[test]
    fn test_hql_dialect_flag() {
        assert!(run(&["render", "from User u"]).is_err());
        assert_eq!(run(&["--dialect", "hql", "render", "from User u"]).unwrap(), "from User u");
    }

    #[test]
    fn test_query_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "select u from User u where u.name = :name").unwrap();
        let path = file.path().to_str().unwrap();

        let output = run(&["inspect", "--file", path]).unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["alias"], "u");
        assert_eq!(report["statement_type"], "SELECT");
        assert_eq!(report["bindings"][0]["identifier"]["name"], "name");
        assert_eq!(report["uses_jdbc_style_parameters"], false);
    }

    #[test]
    fn test_bindings() {
        let output = run(&["bindings", "select u from User u where u.name like %:name%"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["query"], "select u from User u where u.name like :name");
        assert_eq!(parsed["bindings"][0]["kind"]["like_type"], "contains");

        assert!(run(&["bindings", "select u from User u where u.a = ? and u.b = :b"]).is_err());
    }

    #[test]
    fn test_missing_query() {
        assert!(Cli::try_parse_from(["qlr", "render"]).is_err());
        assert!(parse_dto(":name").is_err());
    }
}
