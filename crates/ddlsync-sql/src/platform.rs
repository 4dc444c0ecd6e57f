//! Driver and URL subprotocol lookup.

use crate::{Dialect, MYSQL, ORACLE, POSTGRES};

/// Known driver names and URL subprotocols.
static PLATFORMS: &[(&str, &Dialect)] = &[
    ("org.postgresql.Driver", &POSTGRES),
    ("postgresql", &POSTGRES),
    ("postgres", &POSTGRES),
    ("com.mysql.jdbc.Driver", &MYSQL),
    ("com.mysql.cj.jdbc.Driver", &MYSQL),
    ("org.mariadb.jdbc.Driver", &MYSQL),
    ("mysql", &MYSQL),
    ("mariadb", &MYSQL),
    ("oracle.jdbc.OracleDriver", &ORACLE),
    ("oracle.jdbc.driver.OracleDriver", &ORACLE),
    ("oracle", &ORACLE),
];

/// The dialect for a driver name or URL subprotocol, e.g.
/// `org.postgresql.Driver` or `mysql`.
pub fn platform_for_driver(driver: &str) -> Option<&'static Dialect> {
    PLATFORMS
        .iter()
        .find(|(name, _)| *name == driver)
        .map(|(_, dialect)| *dialect)
}

/// The dialect for a connection URL such as `jdbc:postgresql://host/db` or
/// `mysql://host/db`, based on its subprotocol.
pub fn platform_for_url(url: &str) -> Option<&'static Dialect> {
    let url = url.strip_prefix("jdbc:").unwrap_or(url);
    let end = url.find(':')?;
    platform_for_driver(&url[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_for_driver() {
        assert_eq!(platform_for_driver("org.postgresql.Driver"), Some(&POSTGRES));
        assert_eq!(platform_for_driver("mariadb"), Some(&MYSQL));
        assert_eq!(platform_for_driver("oracle.jdbc.OracleDriver"), Some(&ORACLE));
        assert_eq!(platform_for_driver("sqlite"), None);
    }

    #[test]
    fn test_platform_for_url() {
        assert_eq!(platform_for_url("jdbc:postgresql://localhost/shop"), Some(&POSTGRES));
        assert_eq!(platform_for_url("mysql://root@localhost/shop"), Some(&MYSQL));
        assert_eq!(platform_for_url("jdbc:oracle:thin:@localhost:1521:xe"), Some(&ORACLE));
        assert_eq!(platform_for_url("shop.db"), None);
    }
}
