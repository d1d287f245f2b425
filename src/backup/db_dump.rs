// dbbackup-agent/src/backup/db_dump.rs
use std::path::Path;

use super::target::{DatabaseKind, DatabaseTarget};
use crate::errors::{AppError, Result};
use crate::utils::process::CommandSpec;

const MYSQL_DEFAULT_PORT: u16 = 3306;

/// Builds the native dump invocation for `target`, writing its output to `dump_path`.
///
/// Passwords never travel in argv: PostgreSQL gets `PGPASSWORD` and MySQL gets
/// `MYSQL_PWD`. MongoDB only accepts credentials through the URI.
pub fn build_dump_command(target: &DatabaseTarget, dump_path: &Path) -> Result<CommandSpec> {
    let dump_path = dump_path.display();

    let command = match &target.kind {
        DatabaseKind::Postgresql => {
            let mut command = CommandSpec::new("pg_dump")
                .arg("--format=custom")
                .arg(format!("--file={}", dump_path))
                .arg(target.uri_without_password());
            if let Some(password) = &target.password {
                command = command.env("PGPASSWORD", password.as_str());
            }
            command
        }
        DatabaseKind::Mongodb => CommandSpec::new("mongodump")
            .arg(format!("--uri={}", target.uri()))
            .arg(format!("--archive={}", dump_path)),
        DatabaseKind::Mysql => {
            let mut command = CommandSpec::new("mysqldump")
                .arg(format!("--user={}", target.username))
                .arg(format!("--host={}", target.host))
                .arg(format!("--port={}", target.port.unwrap_or(MYSQL_DEFAULT_PORT)))
                .arg(format!("--result-file={}", dump_path))
                .arg(target.db_name.as_str());
            if let Some(password) = &target.password {
                command = command.env("MYSQL_PWD", password.as_str());
            }
            command
        }
        DatabaseKind::Unrecognized(scheme) => {
            return Err(AppError::UnrecognizedKind(scheme.clone()));
        }
    };

    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "/tmp/backup-x.tar.gz.dump";

    #[test]
    fn test_postgresql_command() -> anyhow::Result<()> {
        let target = DatabaseTarget::parse("postgresql://u:p@h1:5432/db1")?;
        let command = build_dump_command(&target, Path::new(DUMP))?;

        assert_eq!(command.program, "pg_dump");
        assert_eq!(
            command.args,
            vec![
                "--format=custom".to_string(),
                format!("--file={}", DUMP),
                "postgresql://u@h1:5432/db1".to_string(),
            ]
        );
        assert_eq!(command.env_value("PGPASSWORD"), Some("p"));
        Ok(())
    }

    #[test]
    fn test_mongodb_command_uses_full_uri() -> anyhow::Result<()> {
        let uri = "mongodb://u:p@m1:27017/app?replicaSet=rs0&appName=nightly backup";
        let target = DatabaseTarget::parse(uri)?;
        let command = build_dump_command(&target, Path::new(DUMP))?;

        assert_eq!(command.program, "mongodump");
        assert_eq!(
            command.args,
            vec![format!("--uri={}", uri), format!("--archive={}", DUMP)]
        );
        assert!(command.envs.is_empty());
        Ok(())
    }

    #[test]
    fn test_mysql_password_is_not_in_argv() -> anyhow::Result<()> {
        let target = DatabaseTarget::parse("mysql://u:s3cret@h2:3307/db2")?;
        let command = build_dump_command(&target, Path::new(DUMP))?;

        assert_eq!(command.program, "mysqldump");
        assert_eq!(
            command.args,
            vec![
                "--user=u".to_string(),
                "--host=h2".to_string(),
                "--port=3307".to_string(),
                format!("--result-file={}", DUMP),
                "db2".to_string(),
            ]
        );
        assert!(command.args.iter().all(|a| !a.contains("s3cret")));
        assert_eq!(command.env_value("MYSQL_PWD"), Some("s3cret"));
        Ok(())
    }

    #[test]
    fn test_mysql_port_defaults_when_absent() -> anyhow::Result<()> {
        let target = DatabaseTarget::parse("mysql://u@h2/db2")?;
        let command = build_dump_command(&target, Path::new(DUMP))?;

        assert!(command.args.contains(&"--port=3306".to_string()));
        assert_eq!(command.env_value("MYSQL_PWD"), None);
        Ok(())
    }

    #[test]
    fn test_unrecognized_kind_is_a_build_error() -> anyhow::Result<()> {
        let target = DatabaseTarget::parse("redis://cache:6379/0")?;
        match build_dump_command(&target, Path::new(DUMP)) {
            Err(AppError::UnrecognizedKind(kind)) => assert_eq!(kind, "redis"),
            other => panic!("expected unrecognized kind, got {:?}", other),
        }
        Ok(())
    }
}
