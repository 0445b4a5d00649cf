//! The `studytrack init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("studytrack.toml").exists() {
        println!("studytrack.toml already exists, skipping.");
    } else {
        std::fs::write("studytrack.toml", SAMPLE_CONFIG)?;
        println!("Created studytrack.toml");
    }

    std::fs::create_dir_all("curriculum")?;
    let sample_path = Path::new("curriculum/sample.json");
    if sample_path.exists() {
        println!("curriculum/sample.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_CURRICULUM)?;
        println!("Created curriculum/sample.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: studytrack validate --curriculum curriculum/sample.json");
    println!("  2. Write a solution to solution.js");
    println!("  3. Run: studytrack grade --lesson arrays-two-sum --source solution.js");
    println!("  4. Run: studytrack activity");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# studytrack configuration

curriculum = "curriculum/sample.json"

# Completion state. Use type = "http" with base_url to talk to the backend API.
[store]
type = "file"
dir = ".studytrack"

[executor]
node_binary = "node"
# Per-invocation bound in milliseconds; 0 disables it.
timeout_ms = 5000
"#;

const SAMPLE_CURRICULUM: &str = r#"{
  "Arrays": [
    {
      "id": "arrays-two-sum",
      "title": "Two Sum",
      "difficulty": "Easy",
      "explanation": "Use a hash map to remember the index of every value seen so far.",
      "exercise": {
        "prompt": "Return the indices of the two numbers that add up to target.",
        "starterCode": "function twoSum(nums, target) {\n  // your code here\n}",
        "testCases": [
          { "input": { "nums": [2, 7, 11, 15], "target": 9 }, "expected": [0, 1] },
          { "input": { "nums": [3, 2, 4], "target": 6 }, "expected": [1, 2] },
          { "input": { "nums": [3, 3], "target": 6 }, "expected": [0, 1] }
        ]
      }
    }
  ],
  "Strings": [
    {
      "id": "strings-reverse",
      "title": "Reverse a String",
      "difficulty": "Easy",
      "explanation": "Walk two pointers towards the middle, or split, reverse and join.",
      "exercise": {
        "prompt": "Return the input string reversed.",
        "starterCode": "function reverse(s) {\n  // your code here\n}",
        "testCases": [
          { "input": { "s": "hello" }, "expected": "olleh" },
          { "input": { "s": "" }, "expected": "" }
        ]
      }
    }
  ]
}
"#;
