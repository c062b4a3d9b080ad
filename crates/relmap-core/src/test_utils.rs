//! Test utilities for Relmap

use std::fs;
use tempfile::TempDir;

/// Create a repository with a specific file structure
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }

        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// A small Python package exercising aliases, wildcards, re-exports and a
/// class hierarchy.
pub fn create_python_repo() -> TempDir {
    create_repo_with_structure(&[
        (
            "app/main.py",
            r#"import sys
from app.animals import Dog
from app.util import helpers as h
from app.shapes import *


def run():
    dog = Dog()
    dog.fetch()
    h.slugify("x")
    area(2)


if __name__ == "__main__":
    run()
"#,
        ),
        (
            "app/__init__.py",
            r#"from .animals import Dog

__version__ = "1.0"
"#,
        ),
        (
            "app/animals.py",
            r#"class Animal:
    def speak(self):
        return "..."

    def describe(self):
        return self.speak()


class Dog(Animal):
    def speak(self):
        return "woof"

    def fetch(self):
        return self.speak()
"#,
        ),
        (
            "app/shapes.py",
            r#"__all__ = ["area"]


def area(r):
    return 3 * r * r


def perimeter(r):
    return 6 * r
"#,
        ),
        ("app/util/__init__.py", ""),
        (
            "app/util/helpers.py",
            r#"import re


def slugify(text):
    return re.sub("[^a-z]", "-", text)


def _private():
    pass
"#,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_python_repo() {
        let temp_dir = create_python_repo();
        let root = temp_dir.path();

        assert!(root.join("app/main.py").exists());
        assert!(root.join("app/__init__.py").exists());
        assert!(root.join("app/util/helpers.py").exists());
    }
}
