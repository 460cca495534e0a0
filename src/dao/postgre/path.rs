use std::path::PathBuf;

pub fn get_path(dir: &str, file: &str) -> PathBuf {
    let mut buf = PathBuf::new();

    for chunk in [dir, "migration", "postgresql", file] {
        buf.push(chunk);
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_path_points_into_migrations() {
        let path = get_path("/srv/app", "push_subscription.sql");
        assert_eq!(
            path,
            PathBuf::from("/srv/app/migration/postgresql/push_subscription.sql")
        );
    }
}
