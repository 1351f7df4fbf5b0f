use super::MockSource;
use crate::system::source::{NativeProbe, Source};

pub const MEMINFO: &str = "MemTotal:       16318424 kB\n\
                           MemFree:         1734028 kB\n\
                           MemAvailable:    9843620 kB\n\
                           Buffers:          612244 kB\n\
                           Cached:          7120384 kB\n\
                           SwapCached:         1024 kB\n\
                           Slab:             745880 kB\n";

pub const DF_POSIX: &str = "Filesystem     1024-blocks     Used Available Capacity Mounted on\n\
                            /dev/nvme0n1p2   490617784 215838084 249781908      47% /\n";

pub const PS_CPU: &str = "    PID %CPU COMMAND\n\
                          \x20 4211 38.2 firefox\n\
                          \x20 1873 12.0 Xorg\n\
                          \x20 5120  6.4 gnome-shell\n\
                          \x20 7781  2.1 /usr/lib/jvm/bin/java\n\
                          \x20 1123  0.9 systemd-journald\n\
                          \x20  933  0.3 sshd\n";

pub const PS_RSS: &str = "    PID   RSS COMMAND\n\
                          \x20 7781 2097152 java\n\
                          \x20 4211 1048576 firefox\n\
                          \x20 5120  524288 gnome-shell\n\
                          \x20 1873  262144 Xorg\n\
                          \x20 2290  131072 postgres\n\
                          \x20 1123   65536 systemd-journald\n";

fn stat_samples(count: u64) -> Vec<String> {
    (0..count)
        .map(|n| {
            let busy = 100_000 + n * 250;
            let idle = 900_000 + n * 750;
            format!(
                "cpu  {busy} 1200 40000 {idle} 3000 0 800 0 0 0\ncpu0 1 2 3 4\n"
            )
        })
        .collect()
}

impl MockSource {
    pub fn linux_host() -> Self {
        let mut fs = MockSource::new();
        fs.add_command("uname -s", "Linux\n");
        fs.add_sequence(&Source::file("/proc/stat"), stat_samples(16));
        fs.add_file("/proc/meminfo", MEMINFO);

        fs.add_dir("/");
        fs.add_command("df /", DF_POSIX);
        fs.add_command("df -P /", DF_POSIX);

        fs.add_command("ps -eo pid,pcpu,comm --sort=-pcpu", PS_CPU);
        fs.add_command("ps -eo pid,rss,comm --sort=-rss", PS_RSS);

        fs.add_file(
            "/etc/os-release",
            "NAME=\"Debian GNU/Linux\"\nVERSION_ID=\"12\"\nPRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\n",
        );
        fs.add_file("/etc/hostname", "build-07\n");
        fs.add_file("/proc/sys/kernel/osrelease", "6.1.0-18-amd64\n");
        fs.add_file("/proc/uptime", "273845.12 1043820.55\n");
        fs.add_file("/proc/loadavg", "0.42 0.35 0.30 2/611 88123\n");
        fs.add_command(
            "who",
            "alice    pts/0        2024-03-01 09:12 (10.0.0.20)\n\
             bob      pts/1        2024-03-01 09:40 (10.0.0.21)\n\
             alice    pts/2        2024-03-01 10:02 (10.0.0.20)\n",
        );
        fs.add_failing_command("lastb");
        fs.add_file(
            "/var/log/auth.log",
            "Mar  1 09:00:01 build-07 sshd[811]: Failed password for root from 203.0.113.9 port 52144 ssh2\n\
             Mar  1 09:12:44 build-07 sshd[902]: Accepted publickey for alice from 10.0.0.20 port 50022 ssh2\n",
        );
        fs
    }

    /// A macOS host: no procfs, `top` sampling, native memory totals.
    pub fn macos_host() -> Self {
        let mut fs = MockSource::new();
        fs.add_command("uname -s", "Darwin\n");
        fs.add_command(
            "top -l 2 -n 0 -s 1",
            "Processes: 512 total\nCPU usage: 9.1% user, 6.3% sys, 84.6% idle\n\
             Processes: 514 total\nCPU usage: 5.0% user, 3.75% sys, 91.25% idle\n",
        );
        fs.add_native(NativeProbe::Memory, "17179869184 6442450944");

        fs.add_dir("/");
        fs.add_command("df /", DF_POSIX);
        fs.add_command(
            "df -P /",
            "Filesystem   512-blocks      Used Available Capacity Mounted on\n\
             /dev/disk3s1s1 1942700360 20038472 1180405672     2% /\n",
        );

        fs.add_command(
            "ps -Ao pid,pcpu,comm -r",
            "  PID  %CPU COMM\n\
             \x20 612  22.5 /Applications/Safari.app/Contents/MacOS/Safari\n\
             \x20 301   4.0 /System/Library/CoreServices/WindowServer\n",
        );
        fs.add_command(
            "ps -Ao pid,rss,comm -m",
            "  PID    RSS COMM\n\
             \x20 612 812000 /Applications/Safari.app/Contents/MacOS/Safari\n\
             \x20 301 204800 /System/Library/CoreServices/WindowServer\n",
        );

        fs.add_command(
            "sw_vers",
            "ProductName:\t\tmacOS\nProductVersion:\t\t14.4\nBuildVersion:\t\t23E214\n",
        );
        fs.add_command("hostname", "studio.local\n");
        fs.add_command("uname -r", "23.4.0\n");
        fs.add_command(
            "uptime",
            "10:14  up 2 days,  3:07, 2 users, load averages: 1.52 1.61 1.70\n",
        );
        fs.add_command("sysctl -n vm.loadavg", "{ 1.52 1.61 1.70 }\n");
        fs.add_command("who", "carol    console  Mar  1 08:55\n");
        fs
    }

    pub fn empty_host() -> Self {
        MockSource::new()
    }
}
